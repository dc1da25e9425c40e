use thiserror::Error;

/// Contract violations. Network failures never end up here, they are
/// reported through [`crate::ProbeStatus`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Address is empty")]
    EmptyAddress,

    #[error("Address is {len} bytes long, limit is {max}")]
    AddressTooLong { len: usize, max: usize },

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: &'static str },

    #[error("Monitor interval must be positive")]
    ZeroInterval,
}

#[derive(Error, Debug)]
pub enum EchoError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Echo exited with status {0}")]
    Failed(String),

    #[error("Echo timed out")]
    Timeout,

    #[error("Failed to resolve {0}")]
    Resolve(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "icmp-socket")]
    #[error("ICMP error: {0}")]
    Icmp(#[from] surge_ping::SurgeError),
}

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("HTTP client initialization failed: {0}")]
    Init(String),

    #[error("Invalid target URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Other(String),
}
