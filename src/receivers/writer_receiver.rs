use tokio::{
    sync::{
        mpsc
    },
    io::{
        AsyncWrite
    },
    spawn
};
use log::{
    debug
};
use bytes::{
    Bytes
};
use super::{
    receiver::{
        write_received,
        DataReceiver
    }
};

pub fn start_writer_receiver<W>(mut writer: W) -> DataReceiver
where
    W: AsyncWrite + Unpin + Send + 'static
{
    let (sender, receiver) = mpsc::channel::<Bytes>(10);
    let join = spawn(async move{
        let written = write_received(receiver, &mut writer).await?;
        debug!("Writer stopped, {} bytes written", written);
        Ok(written)
    });
    DataReceiver::new(join, sender)
}

/// Raw stream goes to stdout, logs stay on stderr
pub fn start_stdout_receiver() -> DataReceiver {
    start_writer_receiver(tokio::io::stdout())
}
