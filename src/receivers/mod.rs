mod receiver;
mod file_receiver;
mod writer_receiver;

pub use self::{
    receiver::{
        DataReceiver
    },
    file_receiver::{
        start_file_receiver
    },
    writer_receiver::{
        start_stdout_receiver,
        start_writer_receiver
    }
};
