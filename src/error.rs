use thiserror::Error;

/// Errors raised by the interval-set core.
///
/// `Inconsistent` is never auto-recovered: it signals that the global
/// well-formedness invariant (`spec.md` §3) has been violated, which is
/// a bug, not a runtime condition a caller should retry through.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid range: {0}")]
    InvalidInput(String),

    #[error("IPv6 ranges are not supported")]
    Ipv6NotSupported,

    #[error("the given IP was not found in any stored range")]
    NotFound,

    #[error("database inconsistent: {0}")]
    Inconsistent(String),

    #[error("store error: {0}")]
    Store(#[from] sled::Error),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
