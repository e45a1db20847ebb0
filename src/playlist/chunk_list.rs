use m3u8_rs::{
    playlist::{
        MediaPlaylist
    }
};
use url::{
    Url
};
use log::{
    trace
};
use crate::{
    error::{
        AppError
    }
};

/// Парсер ожидает перевод строки в конце последней строки
pub fn with_trailing_newline(data: &[u8]) -> Vec<u8> {
    let mut data = data.to_vec();
    if !data.ends_with(b"\n") {
        data.push(b'\n');
    }
    data
}

pub fn parse_chunk_list(data: &[u8]) -> Result<MediaPlaylist, AppError> {
    let data = with_trailing_newline(data);
    let playlist = m3u8_rs::parse_media_playlist(&data)?.1;
    Ok(playlist)
}

/// Absolute chunk addresses in playlist order
pub fn chunk_addresses(playlist: &MediaPlaylist, chunk_list_url: &Url) -> Result<Vec<String>, AppError> {
    playlist
        .segments
        .iter()
        .map(|segment| -> Result<String, AppError> {
            let address = chunk_list_url.join(segment.uri.trim())?;
            trace!("Chunk url: {}", address);
            Ok(address.into())
        })
        .collect()
}
