use std::{
    io::{
        self
    },
    path::{
        Path,
        PathBuf
    }
};
use tokio::{
    sync::{
        AcquireError,
        mpsc::{
            error::{
                SendError
            }
        }
    }
};
use bytes::{
    Bytes
};
use reqwest::{
    StatusCode
};
use url::{
    ParseError,
    Url
};
use nom::{
    self
};
use quick_error::{
    quick_error
};

quick_error!{
    #[derive(Debug)]
    pub enum AppError {
        /// IO Error
        IoError(err: std::io::Error) {
            from()
            display("I/O: {}", err)
        }

        /// Request timeout
        Timeout(err: tokio::time::error::Elapsed) {
            from()
            display("Timeout: {}", err)
        }

        /// File error
        FileError(filename: PathBuf, err: io::Error) {
            context(path: &'a Path, err: io::Error) -> (path.to_path_buf(), err)
            display("File '{}' error: {}", filename.display(), err)
        }

        /// Join error
        JoinError(err: tokio::task::JoinError) {
            from()
            display("Task join error: {}", err)
        }

        /// Output writer is gone
        ReceiverSendError {
            from(SendError<Bytes>)
            display("Output receiver is closed")
        }

        /// Admission semaphore closed
        AdmissionClosed {
            from(AcquireError)
            display("Admission controller is closed")
        }

        /// URL error
        UrlError(err: ParseError) {
            from()
            display("Url error: {}", err)
        }

        /// Chunk address can't be parsed
        MalformedAddress(address: String, err: ParseError) {
            display("Malformed chunk address '{}': {}", address, err)
        }

        /// Reqwest Error
        ReqwestError(err: reqwest::Error) {
            from()
            display("Reqwest error: {}", err)
        }

        /// Non success HTTP status
        ResponseStatus(url: Url, status: StatusCode) {
            display("Invalid status code '{}' for '{}'", status, url)
        }

        /// Regex error
        RegexError(err: regex::Error) {
            from()
            display("Regex error: {}", err)
        }

        /// M3U error
        M3U8ParseError(err: nom::Err<nom::error::ErrorKind>) {
            from()
            from(err: nom::Err<(&[u8], nom::error::ErrorKind)>) -> (
                match err {
                    nom::Err::Error(e) => {
                        nom::Err::Error(e.1)
                    },
                    nom::Err::Failure(e) => {
                        nom::Err::Failure(e.1)
                    },
                    nom::Err::Incomplete(e) => {
                        nom::Err::Incomplete(e)
                    }
                }
            )
            display("M3U8 parse error: {:?}", err)
        }

        /// Empty master stream
        MasterStreamIsEmpty {
            display("Master stream is empty")
        }

        /// Requested resolution is absent
        NoStreamWithResolution(resolution: String) {
            display("Have no chunklist url with resolution '{}'", resolution)
        }

        /// Page without <source src>
        PlaylistNotFound {
            display("Playlist URL is not found")
        }

        /// Chunk loading failed permanently
        ChunkLoad { address: String, attempts: u32, err: Box<AppError> } {
            display("Chunk '{}' loading failed after {} attempt(s): {}", address, attempts, err)
        }

        /// Same chunk index received twice
        DuplicateChunk(index: usize) {
            display("Chunk with index {} received twice", index)
        }

        /// Workers stopped before all chunks were delivered
        ChunksMissing(next_index: usize, total: usize) {
            display("Loading stopped at chunk {} of {}", next_index, total)
        }

        /// Invalid loading parameters
        InvalidConfig(descr: &'static str) {
            display("Invalid config: {}", descr)
        }

        /// Ctrl + C
        Interrupted {
            display("Loading interrupted")
        }
    }
}

impl AppError {
    /// Transport failures, timeouts and bad statuses are worth another attempt,
    /// everything else is a input or logic error
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ReqwestError(err) => !err.is_builder(),
            AppError::ResponseStatus(..) => true,
            AppError::Timeout(_) => true,
            AppError::IoError(_) => true,
            _ => false
        }
    }
}
