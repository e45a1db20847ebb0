use regex::{
    Regex
};
use url::{
    Url
};
use crate::{
    error::{
        AppError
    }
};

const SOURCE_SRC_PATTERN: &str = r#"(?is)<source\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#;

/// Body of the input url looks like a playlist, not like a html page
pub fn is_playlist(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    text.trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with("#EXTM3U")
}

/// Playlist url from the first `<source src="...">` on the page
pub fn playlist_url_from_page(page: &str, page_url: &Url) -> Result<Url, AppError> {
    let source_regex = Regex::new(SOURCE_SRC_PATTERN)?;

    let src = source_regex
        .captures(page)
        .and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
        })
        .map(|m| m.as_str().trim().replace("&amp;", "&"))
        .filter(|src| !src.is_empty())
        .ok_or(AppError::PlaylistNotFound)?;

    let playlist_url = page_url.join(&src)?;
    Ok(playlist_url)
}
