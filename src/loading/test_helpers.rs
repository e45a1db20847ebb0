use std::{
    collections::{
        HashMap
    },
    io,
    pin::{
        Pin
    },
    sync::{
        atomic::{
            AtomicUsize,
            Ordering
        },
        Arc,
        Mutex
    },
    task::{
        Context,
        Poll
    },
    time::{
        Duration
    }
};
use futures::{
    future::{
        BoxFuture,
        FutureExt
    }
};
use tokio::{
    io::{
        AsyncWrite
    }
};
use bytes::{
    Bytes
};
use reqwest::{
    StatusCode,
    Url
};
use crate::{
    error::{
        AppError
    }
};
use super::{
    chunk_source::{
        ChunkSource
    }
};

struct ScriptedChunk {
    payload: Bytes,
    delay: Duration,
    failures_left: u32
}

#[derive(Default)]
struct Inner {
    chunks: Mutex<HashMap<String, ScriptedChunk>>,
    calls: Mutex<Vec<String>>,
    completions: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize
}

/// Fake source with per-address latency and a number of failing attempts
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<Inner>
}

impl ScriptedSource {
    pub fn new() -> ScriptedSource {
        ScriptedSource::default()
    }

    pub fn with_chunk(self, address: &str, payload: &[u8], delay: Duration, failures: u32) -> ScriptedSource {
        self.inner.chunks.lock().unwrap().insert(address.to_owned(), ScriptedChunk{
            payload: Bytes::copy_from_slice(payload),
            delay,
            failures_left: failures
        });
        self
    }

    pub fn calls(&self, address: &str) -> usize {
        self.inner.calls.lock().unwrap()
            .iter()
            .filter(|v| v.as_str() == address)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    /// Addresses in the order their successful attempts finished
    pub fn completion_order(&self) -> Vec<String> {
        self.inner.completions.lock().unwrap().clone()
    }

    pub fn peak_active(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl ChunkSource for ScriptedSource {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Bytes, AppError>> {
        let inner = self.inner.clone();
        async move {
            let now_active = inner.active.fetch_add(1, Ordering::SeqCst) + 1;
            inner.peak.fetch_max(now_active, Ordering::SeqCst);

            let address = url.as_str().to_owned();
            inner.calls.lock().unwrap().push(address.clone());

            let (delay, result) = {
                let mut chunks = inner.chunks.lock().unwrap();
                match chunks.get_mut(&address) {
                    Some(chunk) if chunk.failures_left > 0 => {
                        chunk.failures_left -= 1;
                        (chunk.delay, Err(AppError::ResponseStatus(url.clone(), StatusCode::INTERNAL_SERVER_ERROR)))
                    },
                    Some(chunk) => {
                        (chunk.delay, Ok(chunk.payload.clone()))
                    },
                    None => {
                        (Duration::from_millis(0), Err(AppError::ResponseStatus(url.clone(), StatusCode::NOT_FOUND)))
                    }
                }
            };

            tokio::time::sleep(delay).await;

            inner.active.fetch_sub(1, Ordering::SeqCst);
            if result.is_ok() {
                inner.completions.lock().unwrap().push(address);
            }
            result
        }.boxed()
    }
}

/// In-memory writer for sink assertions
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl AsyncWrite for SharedBuffer {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Writer that never accepts anything
#[derive(Clone, Default)]
pub struct StalledWriter;

impl AsyncWrite for StalledWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Pending
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}
