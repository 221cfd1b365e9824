//! Outbound fetch collaborator for validated image URLs.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use url::Url;

use crate::error::UploadError;

/// Streamed response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Vec<u8>>> + Send>>;

/// One fetch attempt. Redirects are never followed by the transport — the
/// orchestrator re-validates the target and decides.
pub struct FetchOutcome {
    pub status: u16,
    /// `Location` target when `status` is a redirect.
    pub redirect: Option<String>,
    pub body: BodyStream,
}

impl FetchOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Fetch contract. Implementations must not follow redirects on their own.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, UploadError>> + Send + 'a>>;
}

/// reqwest-backed fetcher with redirect following disabled, so every hop
/// goes back through the URL guard.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a Url,
    ) -> Pin<Box<dyn Future<Output = Result<FetchOutcome, UploadError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| UploadError::FetchFailed(e.to_string()))?;

            let status = response.status().as_u16();
            let redirect = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body: BodyStream = Box::pin(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map(|b| b.to_vec()).map_err(std::io::Error::other)),
            );

            Ok(FetchOutcome {
                status,
                redirect,
                body,
            })
        })
    }
}
