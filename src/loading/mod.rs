mod chunk;
mod chunk_source;
mod retry;
mod admission;
mod reassembler;
#[cfg(test)]
mod test_helpers;

use tokio::{
    sync::{
        mpsc,
        watch
    },
    task::{
        JoinSet
    }
};
use futures::{
    stream::{
        self,
        TryStream,
        TryStreamExt
    }
};
use log::{
    debug,
    info
};
use crate::{
    error::{
        AppError
    },
    receivers::{
        DataReceiver
    }
};
use self::{
    admission::{
        AdmissionController
    },
    chunk::{
        ChunkResult,
        ChunkTask
    },
    reassembler::{
        ordered_payloads,
        LoadingMessage
    },
    retry::{
        fetch_with_retry
    }
};
pub use self::{
    chunk_source::{
        ChunkSource,
        HttpChunkSource
    },
    retry::{
        RetryPolicy
    }
};

#[derive(Debug, Clone)]
pub struct LoadingConfig {
    /// Max chunks loading at the same time
    pub concurrency_limit: usize,
    pub retry: RetryPolicy
}

impl Default for LoadingConfig {
    fn default() -> Self {
        LoadingConfig{
            concurrency_limit: 1,
            retry: RetryPolicy::default()
        }
    }
}

impl LoadingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency_limit < 1 {
            return Err(AppError::InvalidConfig("routines count must be more than 0"));
        }
        self.retry.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Scheduling,
    Draining,
    Complete,
    Aborted
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Aborted)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadingStats {
    pub chunks: usize,
    pub bytes: u64,
    pub peak_in_flight: usize
}

/// Loads chunks concurrently and writes them to the receiver in the original order
pub struct ChunksLoader<C> {
    source: C,
    config: LoadingConfig,
    state: watch::Sender<RunState>
}

impl<C> ChunksLoader<C>
where
    C: ChunkSource
{
    pub fn new(source: C, config: LoadingConfig) -> Result<ChunksLoader<C>, AppError> {
        config.validate()?;
        let (state, _) = watch::channel(RunState::Scheduling);
        Ok(ChunksLoader{
            source,
            config,
            state
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn advance(&self, next: RunState) {
        self.state.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            debug!("Loading state: {:?} -> {:?}", current, next);
            *current = next;
            true
        });
    }

    /// Runs the whole loading, any permanent chunk failure aborts everything
    pub async fn run<S>(self, addresses: S, receiver: &DataReceiver) -> Result<LoadingStats, AppError>
    where
        S: TryStream<Ok=String, Error=AppError>
    {
        let result = self.load_all(addresses, receiver).await;
        match &result {
            Ok(stats) => {
                self.advance(RunState::Complete);
                info!("Loaded {} chunks, {} bytes, up to {} parallel loads", stats.chunks, stats.bytes, stats.peak_in_flight);
            },
            Err(_) => {
                self.advance(RunState::Aborted);
            }
        }
        result
    }

    async fn load_all<S>(&self, addresses: S, receiver: &DataReceiver) -> Result<LoadingStats, AppError>
    where
        S: TryStream<Ok=String, Error=AppError>
    {
        let admission = AdmissionController::new(self.config.concurrency_limit)?;
        let (results_sender, results_receiver) = mpsc::channel::<LoadingMessage>(self.config.concurrency_limit + 1);

        // При выходе из функции все незавершенные загрузки отменяются вместе с JoinSet
        let mut workers = JoinSet::new();

        let dispatch = async {
            let results_sender = results_sender;
            let addresses = addresses.into_stream();
            tokio::pin!(addresses);

            let mut index = 0;
            while let Some(address) = addresses.try_next().await? {
                let slot = admission.acquire().await?;

                // Завершенные воркеры убираем сразу, живых не больше concurrency_limit
                while let Some(finished) = workers.try_join_next() {
                    finished?;
                }

                let task = ChunkTask::new(index, address);
                debug!("Chunk {} dispatched: {}, in flight: {}", task.index, task.address, admission.in_flight());

                let source = self.source.clone();
                let policy = self.config.retry.clone();
                let sender = results_sender.clone();
                workers.spawn(async move {
                    let loaded = fetch_with_retry(&source, &task, &policy).await;

                    let message = match loaded {
                        Ok(loaded) => {
                            LoadingMessage::Loaded(ChunkResult{
                                index: task.index,
                                payload: loaded.payload
                            })
                        },
                        Err(err) => {
                            LoadingMessage::Failed(err)
                        }
                    };
                    // Получатель закрыт только если загрузка уже прервана
                    if sender.send(message).await.is_err() {
                        debug!("Chunk {} result dropped, loading stopped", task.index);
                    }
                    // Слот держим до передачи результата, иначе медленный получатель копит воркеров
                    slot.release();
                });
                index += 1;
            }

            self.advance(RunState::Draining);
            if results_sender.send(LoadingMessage::DispatchFinished(index)).await.is_err() {
                debug!("Results consumer stopped before dispatch finished");
            }
            Ok::<usize, AppError>(index)
        };

        let consume = async {
            let payloads = ordered_payloads(results_receiver);
            tokio::pin!(payloads);

            let mut stats = LoadingStats::default();
            while let Some(data) = payloads.try_next().await? {
                stats.chunks += 1;
                stats.bytes += data.len() as u64;
                receiver.send(data).await?;
            }
            Ok::<LoadingStats, AppError>(stats)
        };

        let (_, mut stats) = tokio::try_join!(dispatch, consume)?;
        stats.peak_in_flight = admission.peak();

        Ok(stats)
    }
}

/// Loads every address in order using `concurrency_limit` parallel loads
pub async fn run_loading<C>(source: C,
                            addresses: Vec<String>,
                            config: LoadingConfig,
                            receiver: &DataReceiver) -> Result<LoadingStats, AppError>
where
    C: ChunkSource
{
    let loader = ChunksLoader::new(source, config)?;
    let addresses = stream::iter(addresses.into_iter().map(Ok::<String, AppError>));
    loader.run(addresses, receiver).await
}
