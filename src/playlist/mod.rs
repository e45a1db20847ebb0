mod page;
mod variants;
mod chunk_list;

use std::{
    time::{
        Duration
    }
};
use tokio::{
    time::{
        timeout
    }
};
use bytes::{
    Bytes
};
use reqwest::{
    Client,
    Url
};
use m3u8_rs::{
    playlist::{
        VariantStream
    }
};
use log::{
    debug,
    info
};
use crate::{
    app_arguments::{
        StreamQuality
    },
    error::{
        AppError
    }
};
use self::{
    chunk_list::{
        chunk_addresses,
        parse_chunk_list,
        with_trailing_newline
    },
    page::{
        is_playlist,
        playlist_url_from_page
    },
    variants::{
        playable_variants,
        select_stream
    }
};

const TEXT_LOAD_TIMEOUT: Duration = Duration::from_secs(20);

async fn load_bytes(http_client: &Client, url: &Url) -> Result<Bytes, AppError> {
    let response = http_client
        .get(url.clone())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::ResponseStatus(url.clone(), status));
    }

    Ok(response.bytes().await?)
}

async fn load_text(http_client: &Client, url: &Url) -> Result<Bytes, AppError> {
    // Оборачиваем целиком запрос в таймаут
    let data = timeout(TEXT_LOAD_TIMEOUT, load_bytes(http_client, url)).await??;
    Ok(data)
}

/// Playlist url and data, the input is either a playlist or a page with `<source>`
async fn load_playlist(http_client: &Client, input_url: &Url) -> Result<(Url, Bytes), AppError> {
    let input_data = load_text(http_client, input_url).await?;
    if is_playlist(&input_data) {
        debug!("Input url is a playlist");
        return Ok((input_url.clone(), input_data));
    }

    let page = String::from_utf8_lossy(&input_data);
    let playlist_url = playlist_url_from_page(&page, input_url)?;
    info!("Playlist url: {}", playlist_url);

    let playlist_data = load_text(http_client, &playlist_url).await?;
    Ok((playlist_url, playlist_data))
}

/// All chunk addresses of the selected stream in playback order
pub async fn resolve_chunk_addresses(http_client: &Client,
                                     input_url: &Url,
                                     quality: &StreamQuality) -> Result<Vec<String>, AppError> {
    let (playlist_url, playlist_data) = load_playlist(http_client, input_url).await?;

    let (chunk_list_url, chunk_list_data) = if m3u8_rs::is_master_playlist(&playlist_data) {
        let master_data = with_trailing_newline(&playlist_data);
        let master = m3u8_rs::parse_master_playlist(&master_data)?.1;
        let stream = select_stream(master, quality)?;

        let chunk_list_url = playlist_url.join(&stream.uri)?;
        info!("Chunks info url: {}", chunk_list_url);

        let data = load_text(http_client, &chunk_list_url).await?;
        (chunk_list_url, data)
    } else {
        // Мастер плейлиста нет, сразу список чанков
        (playlist_url, playlist_data)
    };

    let chunk_list = parse_chunk_list(&chunk_list_data)?;
    let addresses = chunk_addresses(&chunk_list, &chunk_list_url)?;
    info!("Chunks count: {}", addresses.len());

    Ok(addresses)
}

/// Streams available in the master playlist, empty for a plain chunk list
pub async fn list_streams(http_client: &Client, input_url: &Url) -> Result<Vec<VariantStream>, AppError> {
    let (_, playlist_data) = load_playlist(http_client, input_url).await?;
    if !m3u8_rs::is_master_playlist(&playlist_data) {
        return Ok(Vec::new());
    }

    let master_data = with_trailing_newline(&playlist_data);
    let master = m3u8_rs::parse_master_playlist(&master_data)?.1;
    Ok(playable_variants(master))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{
            method,
            path
        },
        Mock,
        MockServer,
        ResponseTemplate
    };

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
hd/index.m3u8
";

    const CHUNK_LIST: &str = "#EXTM3U
#EXT-X-TARGETDURATION:10
#EXTINF:10.0,
seg0.ts
#EXTINF:10.0,
seg1.ts
#EXT-X-ENDLIST
";

    async fn mount(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_page_to_chunks_with_resolution() {
        let server = MockServer::start().await;
        mount(&server, "/watch/page.html", 200, "<video><source src=\"/hls/master.m3u8\"></video>").await;
        mount(&server, "/hls/master.m3u8", 200, MASTER).await;
        mount(&server, "/hls/low/index.m3u8", 200, CHUNK_LIST).await;

        let input = Url::parse(&format!("{}/watch/page.html", server.uri())).unwrap();
        let quality = StreamQuality::Resolution("640x360".to_owned());
        let addresses = resolve_chunk_addresses(&Client::new(), &input, &quality).await.unwrap();

        assert_eq!(addresses, vec![
            format!("{}/hls/low/seg0.ts", server.uri()),
            format!("{}/hls/low/seg1.ts", server.uri())
        ]);
    }

    #[tokio::test]
    async fn test_master_input_maximum_quality() {
        let server = MockServer::start().await;
        mount(&server, "/hls/master.m3u8", 200, MASTER).await;
        mount(&server, "/hls/hd/index.m3u8", 200, CHUNK_LIST).await;

        let input = Url::parse(&format!("{}/hls/master.m3u8", server.uri())).unwrap();
        let addresses = resolve_chunk_addresses(&Client::new(), &input, &StreamQuality::Maximum).await.unwrap();

        assert_eq!(addresses.len(), 2);
        assert!(addresses[0].ends_with("/hls/hd/seg0.ts"));
    }

    #[tokio::test]
    async fn test_chunk_list_input() {
        let server = MockServer::start().await;
        mount(&server, "/live/index.m3u8", 200, CHUNK_LIST).await;

        let input = Url::parse(&format!("{}/live/index.m3u8", server.uri())).unwrap();
        let addresses = resolve_chunk_addresses(&Client::new(), &input, &StreamQuality::Maximum).await.unwrap();
        assert!(addresses[1].ends_with("/live/seg1.ts"));

        let streams = list_streams(&Client::new(), &input).await.unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn test_list_streams() {
        let server = MockServer::start().await;
        mount(&server, "/hls/master.m3u8", 200, MASTER).await;

        let input = Url::parse(&format!("{}/hls/master.m3u8", server.uri())).unwrap();
        let streams = list_streams(&Client::new(), &input).await.unwrap();
        let resolutions: Vec<_> = streams.iter().map(|s| s.resolution.clone()).collect();
        assert_eq!(resolutions, vec![Some("640x360".to_owned()), Some("1280x720".to_owned())]);
    }

    #[tokio::test]
    async fn test_bad_status_propagated() {
        let server = MockServer::start().await;
        mount(&server, "/hls/master.m3u8", 404, "").await;

        let input = Url::parse(&format!("{}/hls/master.m3u8", server.uri())).unwrap();
        let err = resolve_chunk_addresses(&Client::new(), &input, &StreamQuality::Maximum).await.unwrap_err();
        assert!(matches!(err, AppError::ResponseStatus(_, status) if status.as_u16() == 404));
    }
}
