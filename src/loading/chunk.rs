use bytes::{
    Bytes
};

/// Chunk to load, index is the only ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkTask {
    pub index: usize,
    pub address: String
}

impl ChunkTask {
    pub fn new(index: usize, address: String) -> ChunkTask {
        ChunkTask{
            index,
            address
        }
    }
}

/// Loaded chunk payload, travels from worker to the reassembler
#[derive(Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub payload: Bytes
}
