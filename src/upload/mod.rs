//! Upload-by-URL orchestration: guard, fetch, stream, commit, persist.
//!
//! Order is the whole point. The URL guard runs before any fetch; redirect
//! targets re-enter the guard; the body streams to a `.part` file that is
//! renamed into place only when complete; and the stored reference is
//! updated strictly after the rename. An aborted request leaves at most an
//! uncommitted `.part` file and no reference change.

pub mod fetcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use self::fetcher::{FetchOutcome, ImageFetcher};
use crate::config::{UnsafeUrlPolicy, UploadConfig};
use crate::error::UploadError;
use crate::security::UrlSafetyGuard;
use crate::store::{Identity, ProfileImageStore};

/// Extensions an attacker-supplied URL may pick for the on-disk file.
/// Anything else falls back to the default.
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "svg", "gif"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Result of a completed upload operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Reference persisted against the user record.
    pub reference: String,
    /// Committed file, when a fetch actually happened.
    pub stored_file: Option<PathBuf>,
}

pub struct UploadOrchestrator {
    guard: UrlSafetyGuard,
    fetcher: Arc<dyn ImageFetcher>,
    store: Arc<dyn ProfileImageStore>,
    uploads_dir: PathBuf,
    policy: UnsafeUrlPolicy,
    max_redirects: usize,
}

impl UploadOrchestrator {
    pub fn new(
        guard: UrlSafetyGuard,
        fetcher: Arc<dyn ImageFetcher>,
        store: Arc<dyn ProfileImageStore>,
        uploads_dir: PathBuf,
        config: &UploadConfig,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&uploads_dir)?;
        Ok(Self {
            guard,
            fetcher,
            store,
            uploads_dir,
            policy: config.on_unsafe_url,
            max_redirects: config.max_redirects,
        })
    }

    /// Fetch `candidate` and persist it as `user`'s profile image.
    ///
    /// Under the `store-reference` policy a guard deny or fetch failure
    /// degrades to persisting the raw URL string without fetching; persist
    /// failures always propagate so database and filesystem state never
    /// drift apart silently.
    pub async fn upload_profile_image(
        &self,
        user: &Identity,
        candidate: &str,
    ) -> Result<UploadReceipt, UploadError> {
        match self.fetch_and_commit(user, candidate).await {
            Ok(receipt) => Ok(receipt),
            Err(UploadError::PersistFailed(e)) => Err(UploadError::PersistFailed(e)),
            Err(error) if self.policy == UnsafeUrlPolicy::StoreReference => {
                tracing::warn!(
                    user_id = user.id,
                    error = %error,
                    "image fetch not performed; storing raw URL reference"
                );
                self.store
                    .set_profile_image(user.id, candidate)
                    .await
                    .map_err(|e| UploadError::PersistFailed(e.to_string()))?;
                Ok(UploadReceipt {
                    reference: candidate.to_string(),
                    stored_file: None,
                })
            }
            Err(error) => Err(error),
        }
    }

    async fn fetch_and_commit(
        &self,
        user: &Identity,
        candidate: &str,
    ) -> Result<UploadReceipt, UploadError> {
        let url = self.guard.validate(candidate).await?;
        let (final_url, outcome) = self.fetch_following_redirects(url).await?;

        if !outcome.is_success() {
            return Err(UploadError::FetchFailed(format!(
                "upstream returned status {}",
                outcome.status
            )));
        }

        let ext = storage_extension(&final_url);
        let final_path = self.uploads_dir.join(format!("{}.{ext}", user.id));
        let part_path = self.uploads_dir.join(format!("{}.{ext}.part", user.id));

        let written = write_stream(&part_path, outcome.body).await?;
        if written == 0 {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(UploadError::FetchFailed("upstream returned an empty body".into()));
        }

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| UploadError::PersistFailed(e.to_string()))?;

        let reference = format!("/assets/uploads/{}.{ext}", user.id);
        self.store
            .set_profile_image(user.id, &reference)
            .await
            .map_err(|e| UploadError::PersistFailed(e.to_string()))?;

        tracing::info!(user_id = user.id, extension = %ext, "profile image committed");
        Ok(UploadReceipt {
            reference,
            stored_file: Some(final_path),
        })
    }

    /// Fetch, re-running the guard on every redirect target. The transport
    /// never follows redirects on its own.
    async fn fetch_following_redirects(
        &self,
        mut url: Url,
    ) -> Result<(Url, FetchOutcome), UploadError> {
        for _hop in 0..=self.max_redirects {
            let outcome = self.fetcher.fetch(&url).await?;
            if !outcome.is_redirect() {
                return Ok((url, outcome));
            }
            let Some(location) = outcome.redirect else {
                return Err(UploadError::FetchFailed(format!(
                    "redirect status {} without a Location header",
                    outcome.status
                )));
            };
            let target = url
                .join(&location)
                .map_err(|_| UploadError::Denied(crate::security::DenyReason::MalformedUrl))?;
            url = self.guard.validate(target.as_str()).await?;
        }
        Err(UploadError::TooManyRedirects(self.max_redirects))
    }
}

/// Drain `body` into `part_path`, cleaning the partial file up on any error.
async fn write_stream(part_path: &Path, mut body: fetcher::BodyStream) -> Result<u64, UploadError> {
    let mut file = tokio::fs::File::create(part_path)
        .await
        .map_err(|e| UploadError::PersistFailed(e.to_string()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(part_path).await;
                return Err(UploadError::FetchFailed(e.to_string()));
            }
        };
        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            let _ = tokio::fs::remove_file(part_path).await;
            return Err(UploadError::PersistFailed(e.to_string()));
        }
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| UploadError::PersistFailed(e.to_string()))?;
    Ok(written)
}

/// Storage extension from the URL's trailing path segment, restricted to
/// the allow-list so the candidate can never pick an executable suffix.
#[must_use]
pub fn storage_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
