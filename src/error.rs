use thiserror::Error;

use crate::security::DenyReason;

// ─── Upload orchestration errors ─────────────────────────────────────────────

/// Failures of the upload-by-URL flow. Guard denies arrive as values via
/// `Denied`; the rest happen after a deny-free validation.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("denied: {0}")]
    Denied(#[from] DenyReason),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("redirect chain exceeded {0} hops")]
    TooManyRedirects(usize),

    #[error("persist failed: {0}")]
    PersistFailed(String),
}

impl UploadError {
    /// Stable label for HTTP responses; never carries upstream detail.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Denied(reason) => reason.kind(),
            Self::FetchFailed(_) => "fetch_failed",
            Self::TooManyRedirects(_) => "too_many_redirects",
            Self::PersistFailed(_) => "persist_failed",
        }
    }
}

// ─── Key-file errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("denied: {0}")]
    Denied(#[from] DenyReason),

    #[error("no such key file")]
    NotFound,

    #[error("io: {0}")]
    Io(String),
}

// ─── Store errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlx: {0}")]
    Sqlx(String),

    #[error("unknown user id {0}")]
    UnknownUser(i64),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Sqlx(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_upload_keeps_the_guard_kind() {
        let err = UploadError::Denied(DenyReason::InternalAddress("10.0.0.1".into()));
        assert_eq!(err.kind(), "internal_address");
        assert!(err.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn fetch_kind_hides_upstream_detail() {
        let err = UploadError::FetchFailed("connection refused by 192.168.0.1".into());
        assert_eq!(err.kind(), "fetch_failed");
        assert!(!err.kind().contains("192.168"));
    }

    #[test]
    fn store_error_wraps_sqlx_messages() {
        let err = StoreError::Sqlx("database is locked".into());
        assert!(err.to_string().contains("database is locked"));
    }
}
