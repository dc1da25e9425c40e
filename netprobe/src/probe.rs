use crate::{
    address,
    echo::{EchoProber, SystemPing},
    error::ProbeError,
    fallback::{FallbackRequest, HttpProbeFactory, ReqwestFactory},
    status::{ConnectionState, ProbeStatus},
};
use derive_builder::Builder;
use netprobe_config::{
    settings::{DEFAULT_ADDRESS, DEFAULT_USER_AGENT},
    ConfigError, EchoBackend, ProbeSettings,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, warn};

#[derive(Builder, Clone, Debug, PartialEq, Eq)]
#[builder(public, setter(into))]
pub struct ProbeOptions {
    /// Target used when the caller does not name one.
    #[builder(default = "DEFAULT_ADDRESS.to_string()")]
    pub default_address: String,
    #[builder(default = "std::time::Duration::from_secs(3)")]
    pub echo_timeout: Duration,
    #[builder(default = "std::time::Duration::from_secs(2)")]
    pub fallback_timeout: Duration,
    #[builder(default = "address::MAX_ADDRESS_LEN")]
    pub max_address_len: usize,
    /// Treat 4xx/5xx fallback answers as unreachable.
    #[builder(default = "false")]
    pub require_success_status: bool,
    #[builder(default = "true")]
    pub use_proxy: bool,
    #[builder(default = "DEFAULT_USER_AGENT.to_string()")]
    pub user_agent: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            default_address: DEFAULT_ADDRESS.to_string(),
            echo_timeout: Duration::from_secs(3),
            fallback_timeout: Duration::from_secs(2),
            max_address_len: address::MAX_ADDRESS_LEN,
            require_success_status: false,
            use_proxy: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&ProbeSettings> for ProbeOptions {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            default_address: settings.address.clone(),
            echo_timeout: settings.echo_timeout(),
            fallback_timeout: settings.fallback_timeout(),
            max_address_len: settings.max_address_len,
            require_success_status: settings.fallback.require_success_status,
            use_proxy: settings.fallback.use_proxy,
            user_agent: settings.fallback.user_agent.clone(),
        }
    }
}

/// Internet connectivity probe.
///
/// Sends one echo request to the target. If that fails for any reason, a
/// HEAD request over HTTP (IPv4 only) is tried instead. The first success
/// wins. The call blocks for at most the echo timeout plus the fallback
/// timeout (plus a short grace period for the `ping` child to exit).
///
/// A `Probe` carries no state between calls and can be shared across threads.
pub struct Probe {
    echo: Box<dyn EchoProber>,
    fallback: Box<dyn HttpProbeFactory>,
    options: ProbeOptions,
}

impl Default for Probe {
    fn default() -> Self {
        Self::new(ProbeOptions::default())
    }
}

impl Probe {
    /// Probe that uses the system `ping` and a `reqwest` fallback.
    pub fn new(options: ProbeOptions) -> Self {
        Self::with_collaborators(SystemPing::default(), ReqwestFactory, options)
    }

    pub fn with_collaborators(
        echo: impl EchoProber + 'static,
        fallback: impl HttpProbeFactory + 'static,
        options: ProbeOptions,
    ) -> Self {
        Self {
            echo: Box::new(echo),
            fallback: Box::new(fallback),
            options,
        }
    }

    pub fn from_settings(settings: &ProbeSettings) -> Result<Self, ConfigError> {
        let options = ProbeOptions::from(settings);
        match settings.echo.backend {
            EchoBackend::Command => Ok(Self::with_collaborators(
                SystemPing::new(settings.echo.program.clone()),
                ReqwestFactory,
                options,
            )),
            #[cfg(feature = "icmp-socket")]
            EchoBackend::Socket => Ok(Self::with_collaborators(
                crate::echo::IcmpSocket,
                ReqwestFactory,
                options,
            )),
            #[cfg(not(feature = "icmp-socket"))]
            EchoBackend::Socket => Err(ConfigError::InvalidValue {
                key: "probe.echo.backend".to_string(),
                reason: "socket backend needs the `icmp-socket` feature"
                    .to_string(),
            }),
        }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Probe `address`, or the configured default when `None`.
    ///
    /// Only an address that breaks the input policy produces an error;
    /// every network outcome is a [`ProbeStatus`].
    pub fn probe(&self, address: Option<&str>) -> Result<ProbeStatus, ProbeError> {
        let address = address.unwrap_or(&self.options.default_address);
        let address = address::validate(address, self.options.max_address_len)?;

        debug!(
            "Echo probe to {} (timeout {:?})",
            address, self.options.echo_timeout
        );
        match self.echo.echo(address, self.options.echo_timeout) {
            Ok(()) => {
                debug!("Echo reply from {}", address);
                return Ok(ProbeStatus::Reachable);
            }
            Err(err) => {
                warn!("Echo to {} failed, trying HTTP: {}", address, err);
            }
        }

        Ok(self.fallback(address))
    }

    fn fallback(&self, address: &str) -> ProbeStatus {
        let request = FallbackRequest {
            timeout: self.options.fallback_timeout,
            ipv4_only: true,
            no_body: true,
            use_proxy: self.options.use_proxy,
            user_agent: self.options.user_agent.clone(),
        };

        let client = match self.fallback.create(&request) {
            Ok(client) => client,
            Err(err) => {
                error!("Cannot create fallback HTTP client: {}", err);
                return ProbeStatus::ProbeInfrastructureUnavailable;
            }
        };

        let outcome = client.head(address);
        drop(client);

        match outcome {
            Ok(response)
                if self.options.require_success_status && !response.is_success() =>
            {
                warn!("HTTP probe to {} answered {}", address, response.status);
                ProbeStatus::UnreachableViaBothMethods
            }
            Ok(response) => {
                debug!("HTTP probe to {} answered {}", address, response.status);
                ProbeStatus::Reachable
            }
            Err(err) => {
                warn!("HTTP probe to {} failed: {}", address, err);
                ProbeStatus::UnreachableViaBothMethods
            }
        }
    }

    /// Same as [`Probe::probe`], flattened to the integer code.
    pub fn network_state(&self, address: Option<&str>) -> Result<i32, ProbeError> {
        self.probe(address).map(ProbeStatus::code)
    }

    pub fn state(
        &self,
        address: Option<&str>,
    ) -> Result<ConnectionState, ProbeError> {
        self.probe(address).map(ProbeStatus::state)
    }

    /// Run the blocking probe on tokio's blocking pool.
    pub async fn probe_async(
        self: Arc<Self>,
        address: Option<String>,
    ) -> Result<ProbeStatus, ProbeError> {
        let handle =
            tokio::task::spawn_blocking(move || self.probe(address.as_deref()));
        match handle.await {
            Ok(result) => result,
            Err(err) => {
                error!("Probe task failed: {:?}", err);
                Ok(ProbeStatus::ProbeInfrastructureUnavailable)
            }
        }
    }
}
