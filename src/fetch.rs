//! Byte acquisition from URLs or in-memory buffers.

use std::fmt;

use futures_util::StreamExt;
use log::debug;

use crate::error::Error;
use crate::models::TensorDescriptor;
use crate::npy::{DecoderOptions, NpyDecoder};

/// Upper bound on the buffer reserved up front from a declared length.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Progress callback: `(received_bytes, declared_total_or_zero)`.
pub type ProgressFn = Box<dyn FnMut(u64, u64) + Send>;

/// Where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Buffer(Vec<u8>),
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Source::Url(url.to_string())
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Source::Url(url)
    }
}

impl From<Vec<u8>> for Source {
    fn from(buffer: Vec<u8>) -> Self {
        Source::Buffer(buffer)
    }
}

/// Options for [`acquire`].
#[derive(Default)]
pub struct FetchOptions {
    pub on_progress: Option<ProgressFn>,
    pub client: Option<reqwest::Client>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("client", &self.client)
            .finish()
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streams the body and reports progress after every chunk.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }
}

/// Returns the bytes behind `source`.
///
/// Buffers come back unchanged. URLs are fetched with a GET; with a progress
/// callback the body is read chunk by chunk, otherwise in one read.
pub async fn acquire(source: impl Into<Source>, options: FetchOptions) -> Result<Vec<u8>, Error> {
    let url = match source.into() {
        Source::Buffer(buffer) => return Ok(buffer),
        Source::Url(url) => url,
    };

    let client = options.client.unwrap_or_default();
    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus { status, url });
    }

    let Some(mut on_progress) = options.on_progress else {
        let body = response.bytes().await?;
        debug!("fetched {} bytes from {}", body.len(), url);
        return Ok(body.to_vec());
    };

    let total = response.content_length().unwrap_or(0);
    let mut received: u64 = 0;
    let mut buffer = Vec::with_capacity(total.min(MAX_PREALLOCATION) as usize);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        received += chunk.len() as u64;
        buffer.extend_from_slice(&chunk);
        on_progress(received, total);
    }
    debug!("streamed {} of {} declared bytes from {}", received, total, url);
    Ok(buffer)
}

/// Acquires `source` and decodes it as an `.npy` tensor.
pub async fn load(
    source: impl Into<Source>,
    fetch_options: FetchOptions,
    decoder_options: DecoderOptions,
) -> Result<TensorDescriptor, Error> {
    let bytes = acquire(source, fetch_options).await?;
    NpyDecoder::new(decoder_options).decode(&bytes)
}
