pub mod address;
pub mod path_guard;
pub mod url_guard;

use thiserror::Error;

pub use address::{AddressClass, classify, classify_literal};
pub use url_guard::{Resolver, SystemResolver, UrlSafetyGuard};

/// Closed rejection taxonomy shared by both guards. A deny is a value, never
/// a fault: callers match on it to decide the response, and nothing
/// side-effecting may run once one is produced.
///
/// `Display` carries detail for logs. HTTP responses must use
/// [`DenyReason::kind`] plus a fixed message so resolved addresses and
/// filesystem layout never reach the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    // ── URL guard ───────────────────────────────────────────────────────
    #[error("candidate does not parse as a URL")]
    MalformedUrl,

    #[error("scheme '{0}' is not http or https")]
    DisallowedScheme(String),

    #[error("URL embeds userinfo credentials")]
    EmbeddedCredentials,

    #[error("hostname is empty or localhost")]
    EmptyOrLocalHost,

    #[error("address {0} is private, link-local, or otherwise non-routable")]
    InternalAddress(String),

    #[error("hostname did not resolve to any address")]
    ResolutionFailed,

    // ── Path guard ──────────────────────────────────────────────────────
    #[error("file name contains a path separator")]
    PathSeparator,

    #[error("file name contains a traversal sequence")]
    TraversalSequence,

    #[error("file name is an absolute path")]
    AbsolutePath,

    #[error("resolved path escapes the base directory")]
    OutsideBase,
}

impl DenyReason {
    /// Stable label for HTTP responses and metrics. Never carries the
    /// offending address or path.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedUrl => "malformed_url",
            Self::DisallowedScheme(_) => "disallowed_scheme",
            Self::EmbeddedCredentials => "embedded_credentials",
            Self::EmptyOrLocalHost => "empty_or_local_host",
            Self::InternalAddress(_) => "internal_address",
            Self::ResolutionFailed => "resolution_failed",
            Self::PathSeparator => "path_separator",
            Self::TraversalSequence => "traversal_sequence",
            Self::AbsolutePath => "absolute_path",
            Self::OutsideBase => "outside_base",
        }
    }
}
