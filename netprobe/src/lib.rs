//! # netprobe
//!
//! Tells whether the host can reach the internet. A single echo request goes
//! to the target first; when that fails (ICMP is filtered on plenty of
//! networks) an HTTP HEAD request over IPv4 is tried instead.
//!
//! The result is a tri-state [`ProbeStatus`]:
//!
//! - `Reachable` (`0`)
//! - `ProbeInfrastructureUnavailable` (`-1`): the HTTP client could not be
//!   created
//! - `UnreachableViaBothMethods` (`-2`)
//!
//! ```no_run
//! use netprobe::{Probe, ProbeStatus};
//!
//! let probe = Probe::default();
//! let status = probe.probe(None).unwrap();
//! assert_eq!(status, ProbeStatus::Reachable);
//! ```
//!
//! ## Modules
//!
//! - `probe`: the probe itself and its options.
//! - `echo`: echo probers (system `ping`, optional ICMP socket).
//! - `fallback`: HTTP fallback client.
//! - `monitor`: periodic probing with event subscription.
//! - `observability`: tracing setup for binaries.
pub mod address;
pub mod echo;
pub mod error;
pub mod fallback;
pub mod monitor;
pub mod observability;
pub mod probe;
pub mod status;

pub use echo::{EchoProber, SystemPing};
pub use error::{EchoError, FallbackError, ProbeError};
pub use fallback::{
    FallbackRequest, HeadResponse, HttpProbeClient, HttpProbeFactory,
    ReqwestFactory,
};
pub use monitor::{Monitor, MonitorOptions, MonitorOptionsBuilder, PingEvent};
pub use probe::{Probe, ProbeOptions, ProbeOptionsBuilder};
pub use status::{ConnectionState, ProbeStatus};

// re-export
pub use netprobe_config as config;
pub use tracing;

/// Probe `address` (or the default target) with a default [`Probe`] and
/// return the integer status code.
pub fn network_state(address: Option<&str>) -> Result<i32, ProbeError> {
    Probe::default().network_state(address)
}
