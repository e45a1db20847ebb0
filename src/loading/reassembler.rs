use std::{
    collections::{
        BTreeMap
    }
};
use tokio::{
    sync::{
        mpsc
    }
};
use futures::{
    stream::{
        Stream
    }
};
use bytes::{
    Bytes
};
use async_stream::{
    try_stream
};
use log::{
    trace
};
use crate::{
    error::{
        AppError
    }
};
use super::{
    chunk::{
        ChunkResult
    }
};

/// Messages from the dispatcher and workers to the single consumer
#[derive(Debug)]
pub enum LoadingMessage {
    Loaded(ChunkResult),
    Failed(AppError),
    /// Every task is dispatched, value is the total chunks count
    DispatchFinished(usize)
}

/// Keeps out of order chunks until every previous chunk has been emitted
#[derive(Debug, Default)]
pub struct OrderedReassembler {
    next_expected: usize,
    pending: BTreeMap<usize, Bytes>
}

impl OrderedReassembler {
    pub fn new() -> OrderedReassembler {
        OrderedReassembler::default()
    }

    /// Returns payloads that became ready for output, in index order
    pub fn accept(&mut self, result: ChunkResult) -> Result<Vec<Bytes>, AppError> {
        let ChunkResult{index, payload} = result;

        if index < self.next_expected || self.pending.contains_key(&index) {
            return Err(AppError::DuplicateChunk(index));
        }

        if index != self.next_expected {
            trace!("Chunk {} buffered, waiting for {}", index, self.next_expected);
            self.pending.insert(index, payload);
            return Ok(Vec::new());
        }

        let mut ready = vec![payload];
        self.next_expected += 1;
        while let Some(payload) = self.pending.remove(&self.next_expected) {
            ready.push(payload);
            self.next_expected += 1;
        }
        Ok(ready)
    }

    pub fn next_expected(&self) -> usize {
        self.next_expected
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Turns loading messages into the ordered stream of chunk payloads.
///
/// Ends successfully once all dispatched chunks are emitted, the first failure
/// ends the stream with that error.
pub fn ordered_payloads(mut receiver: mpsc::Receiver<LoadingMessage>) -> impl Stream<Item=Result<Bytes, AppError>> {
    try_stream!{
        let mut reassembler = OrderedReassembler::new();
        let mut total: Option<usize> = None;
        loop {
            if total == Some(reassembler.next_expected()) {
                break;
            }

            // Канал закрыт раньше времени - значит какой-то воркер пропал без результата
            let message = receiver
                .recv()
                .await
                .ok_or_else(|| {
                    let next = reassembler.next_expected();
                    AppError::ChunksMissing(next, total.unwrap_or(next + reassembler.pending_count()))
                })?;

            match message {
                LoadingMessage::Loaded(chunk) => {
                    for payload in reassembler.accept(chunk)? {
                        yield payload;
                    }
                },
                LoadingMessage::Failed(err) => {
                    Err::<(), AppError>(err)?;
                },
                LoadingMessage::DispatchFinished(count) => {
                    trace!("All {} chunks dispatched", count);
                    total = Some(count);
                }
            }
        }
    }
}
