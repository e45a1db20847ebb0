use m3u8_rs::{
    playlist::{
        MasterPlaylist,
        VariantStream
    }
};
use log::{
    debug
};
use crate::{
    app_arguments::{
        StreamQuality
    },
    error::{
        AppError
    }
};

fn bandwidth(variant: &VariantStream) -> u64 {
    variant.bandwidth
        .trim()
        .parse::<u64>()
        .unwrap_or(0)
}

pub fn playable_variants(playlist: MasterPlaylist) -> Vec<VariantStream> {
    playlist
        .variants
        .into_iter()
        .filter(|v| !v.is_i_frame)
        .collect()
}

/// Variant with the requested resolution or the one with the highest bandwidth
pub fn select_stream(playlist: MasterPlaylist, quality: &StreamQuality) -> Result<VariantStream, AppError> {
    let variants = playable_variants(playlist);
    if variants.is_empty() {
        return Err(AppError::MasterStreamIsEmpty);
    }

    let selected = match quality {
        StreamQuality::Maximum => {
            variants
                .into_iter()
                .max_by_key(bandwidth)
                .ok_or(AppError::MasterStreamIsEmpty)?
        },
        StreamQuality::Resolution(resolution) => {
            variants
                .into_iter()
                .find(|v| v.resolution.as_deref() == Some(resolution.as_str()))
                .ok_or_else(|| AppError::NoStreamWithResolution(resolution.clone()))?
        }
    };
    debug!("Selected stream: {} ({:?}, {})", selected.uri, selected.resolution, selected.bandwidth);

    Ok(selected)
}
