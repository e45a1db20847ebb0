use futures::{
    future::{
        BoxFuture,
        FutureExt
    }
};
use bytes::{
    Bytes
};
use reqwest::{
    Client,
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

/// Something able to load the bytes of a single chunk
pub trait ChunkSource: Clone + Send + Sync + 'static {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Bytes, AppError>>;
}

#[derive(Clone)]
pub struct HttpChunkSource {
    http_client: Client
}

impl HttpChunkSource {
    pub fn new(http_client: Client) -> HttpChunkSource {
        HttpChunkSource{
            http_client
        }
    }
}

impl ChunkSource for HttpChunkSource {
    fn fetch(&self, url: Url) -> BoxFuture<'static, Result<Bytes, AppError>> {
        let http_client = self.http_client.clone();
        async move {
            trace!("Chunk request: {}", url);

            let response = http_client
                .get(url.clone())
                .send()
                .await?;

            // Плохой статус считаем такой же ошибкой, как и обрыв соединения
            let status = response.status();
            if !status.is_success() {
                return Err(AppError::ResponseStatus(url, status));
            }

            let data = response
                .bytes()
                .await?;

            Ok(data)
        }.boxed()
    }
}
