use std::{
    ops::{
        Range
    },
    time::{
        Duration
    }
};
use tokio::{
    time::{
        sleep,
        timeout
    }
};
use rand::{
    Rng
};
use bytes::{
    Bytes
};
use reqwest::{
    Url
};
use log::{
    debug,
    warn
};
use crate::{
    error::{
        AppError
    }
};
use super::{
    chunk::{
        ChunkTask
    },
    chunk_source::{
        ChunkSource
    }
};

/// Retry parameters for a single chunk.
///
/// Delay before the next attempt is `base_delay * multiplier`, after each sleep
/// the multiplier is scaled by a random factor from `multiplier_range`
/// and never drops below 1.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Upper bound for a single backoff sleep, unbounded if `None`
    pub max_delay: Option<Duration>,
    /// Limit for a single request
    pub attempt_timeout: Option<Duration>,
    pub multiplier_range: Range<f64>
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy{
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: None,
            attempt_timeout: Some(Duration::from_secs(30)),
            multiplier_range: 0.0..10.0
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_attempts < 1 {
            return Err(AppError::InvalidConfig("attempts count must be more than 0"));
        }
        if !(self.multiplier_range.start >= 0.0) || self.multiplier_range.end > f64::MAX {
            return Err(AppError::InvalidConfig("backoff multiplier range must be finite and positive"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct RetryState {
    attempt_count: u32,
    backoff_multiplier: f64
}

impl RetryState {
    fn new() -> RetryState {
        RetryState{
            attempt_count: 0,
            backoff_multiplier: 1.0
        }
    }

    fn current_delay(&self, policy: &RetryPolicy) -> Duration {
        // Множитель растет без ограничений, переполнение означает "очень долго"
        let delay = Duration::try_from_secs_f64(policy.base_delay.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(Duration::MAX);
        match policy.max_delay {
            Some(max_delay) => delay.min(max_delay),
            None => delay
        }
    }

    fn grow<R: Rng>(&mut self, policy: &RetryPolicy, rng: &mut R) {
        let factor = if policy.multiplier_range.is_empty() {
            1.0
        } else {
            rng.gen_range(policy.multiplier_range.clone())
        };
        self.backoff_multiplier = (self.backoff_multiplier * factor).max(1.0);
    }
}

/// Successfully loaded chunk with the number of attempts it took
#[derive(Debug)]
pub struct LoadedChunk {
    pub payload: Bytes,
    pub attempts: u32
}

async fn fetch_attempt<C: ChunkSource>(source: &C, url: &Url, policy: &RetryPolicy) -> Result<Bytes, AppError> {
    let fetch_future = source.fetch(url.clone());
    match policy.attempt_timeout {
        Some(limit) => Ok(timeout(limit, fetch_future).await??),
        None => fetch_future.await
    }
}

/// Loads one chunk, transient errors are retried up to `max_attempts` in total.
///
/// A malformed address fails immediately without any request. Any other final
/// failure is wrapped into `AppError::ChunkLoad` with the chunk address.
pub async fn fetch_with_retry<C>(source: &C, task: &ChunkTask, policy: &RetryPolicy) -> Result<LoadedChunk, AppError>
where
    C: ChunkSource
{
    let url = Url::parse(&task.address)
        .map_err(|err| AppError::MalformedAddress(task.address.clone(), err))?;

    let mut state = RetryState::new();
    loop {
        state.attempt_count += 1;

        let err = match fetch_attempt(source, &url, policy).await {
            Ok(payload) => {
                if state.attempt_count > 1 {
                    debug!("Chunk {} loaded after {} attempts", task.index, state.attempt_count);
                }
                return Ok(LoadedChunk{
                    payload,
                    attempts: state.attempt_count
                });
            },
            Err(err) => err
        };

        warn!("Get error from '{}': {}", url, err);

        if !err.is_retryable() || state.attempt_count >= policy.max_attempts {
            return Err(AppError::ChunkLoad{
                address: task.address.clone(),
                attempts: state.attempt_count,
                err: Box::new(err)
            });
        }

        let delay = state.current_delay(policy);
        debug!("Chunk {} next attempt in {:?}", task.index, delay);
        sleep(delay).await;

        state.grow(policy, &mut rand::thread_rng());
    }
}
