pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod settings;

pub use config::{ConfigError, Configurable, FileConfig};
pub use settings::{
    EchoBackend, EchoSettings, FallbackSettings, MonitorSettings, ProbeSettings,
};

#[cfg(feature = "http")]
pub use reqwest;
