use std::{
    path::{
        PathBuf
    }
};
use tokio::{
    sync::{
        mpsc
    },
    fs::{
        File
    },
    spawn
};
use log::{
    info
};
use bytes::{
    Bytes
};
use quick_error::{
    ResultExt
};
use super::{
    receiver::{
        write_received,
        DataReceiver
    }
};


pub fn start_file_receiver(path: PathBuf) -> DataReceiver {
    let (sender, file_receiver) = mpsc::channel::<Bytes>(10);
    let join = spawn(async move{
        let mut file = File::create(&path)
            .await
            .context(path.as_path())?;
        info!("Result file '{}' opened", path.display());

        let written = write_received(file_receiver, &mut file).await?;
        file.sync_all()
            .await
            .context(path.as_path())?;
        info!("File write stopped, {} bytes saved", written);
        Ok(written)
    });

    DataReceiver::new(join, sender)
}
