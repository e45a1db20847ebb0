use tokio::{
    task::{
        JoinHandle
    },
    sync::{
        mpsc
    },
    io::{
        AsyncWrite,
        AsyncWriteExt
    }
};
use bytes::{
    Bytes
};
use log::{
    trace,
    warn
};
use crate::{
    error::{
        AppError
    }
};

enum Inner{
    Active{
        join: JoinHandle<Result<u64, AppError>>,
        sender: mpsc::Sender<Bytes>
    },
    Complete
}

/// Handle to a spawned writer task
pub struct DataReceiver {
    inner: Inner
}
impl DataReceiver {
    pub fn new(join: JoinHandle<Result<u64, AppError>>, sender: mpsc::Sender<Bytes>) -> DataReceiver{
        DataReceiver{
            inner: Inner::Active{
                join,
                sender
            }
        }
    }

    /// Closes the channel and waits for the writer, returns total bytes written
    pub async fn stop_and_wait_finish(mut self) -> Result<u64, AppError>{
        let old_status = std::mem::replace(&mut self.inner, Inner::Complete);
        match old_status {
            Inner::Active{sender, join} => {
                drop(sender);
                join.await?
            },
            Inner::Complete => {
                Ok(0)
            }
        }
    }

    /// Stops the receiver after loading finished.
    ///
    /// When loading failed only because the writer was gone, the writer's own
    /// error is returned instead.
    pub async fn finish_after<T>(self, loading_result: Result<T, AppError>) -> Result<(T, u64), AppError>{
        let receiver_result = self.stop_and_wait_finish().await;
        match (loading_result, receiver_result) {
            (Ok(value), Ok(written)) => {
                Ok((value, written))
            },
            (Err(AppError::ReceiverSendError), Err(writer_err)) => {
                Err(writer_err)
            },
            (Err(err), Err(writer_err)) => {
                warn!("Output finished with error: {}", writer_err);
                Err(err)
            },
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => {
                Err(err)
            }
        }
    }

    pub async fn send(&self, data: Bytes) -> Result<(), AppError>{
        match &self.inner {
            Inner::Active{sender, ..} => {
                // Писатель умер - данные терять нельзя
                sender.send(data).await?;
                Ok(())
            },
            Inner::Complete => {
                Err(AppError::ReceiverSendError)
            }
        }
    }
}
impl Drop for DataReceiver{
    fn drop(&mut self) {
        match &self.inner {
            Inner::Active{..} => {
                warn!("Data receiver dropped while not finished");
            },
            Inner::Complete => {
            }
        }
    }
}

pub(super) async fn write_received<W>(mut receiver: mpsc::Receiver<Bytes>, writer: &mut W) -> Result<u64, AppError>
where
    W: AsyncWrite + Unpin
{
    let mut written = 0;
    while let Some(data) = receiver.recv().await {
        writer.write_all(&data).await?;
        written += data.len() as u64;
        trace!("Written {} bytes, total {}", data.len(), written);
    }
    writer.flush().await?;
    Ok(written)
}
