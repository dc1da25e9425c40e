//! Periodic connectivity monitor.
//!
//! Probes once right away and then on every interval tick. Each result is
//! published as a [`PingEvent`] on a broadcast channel, and the most recent
//! state is kept in a watch channel for callers that only care about "now".
use crate::{
    address,
    error::ProbeError,
    probe::Probe,
    status::{ConnectionState, ProbeStatus},
};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{info, warn, Instrument};

#[derive(Builder, Clone, Debug)]
#[builder(public, setter(into))]
pub struct MonitorOptions {
    #[builder(default = "std::time::Duration::from_secs(30)")]
    pub interval: Duration,
    /// `None` probes the probe's default address.
    #[builder(default = "None")]
    pub address: Option<String>,
    #[builder(default = "16")]
    pub event_capacity: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            address: None,
            event_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingEvent {
    pub address: String,
    pub status: ProbeStatus,
    pub state: ConnectionState,
    pub checked_at: SystemTime,
}

pub(crate) enum MonitorCommand {
    Shutdown,
}

/// Handle to a running monitor task.
pub struct Monitor {
    commands: mpsc::Sender<MonitorCommand>,
    events: broadcast::Sender<PingEvent>,
    latest: watch::Receiver<Option<ConnectionState>>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Validate the target and interval, then spawn the monitor loop on the
    /// current runtime.
    pub fn start(
        probe: Arc<Probe>,
        options: MonitorOptions,
    ) -> Result<Self, ProbeError> {
        if options.interval.is_zero() {
            return Err(ProbeError::ZeroInterval);
        }
        let address = options
            .address
            .clone()
            .unwrap_or_else(|| probe.options().default_address.clone());
        address::validate(&address, probe.options().max_address_len)?;

        let (commands, command_receiver) = mpsc::channel(1);
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (latest_sender, latest) = watch::channel(None);

        let span = tracing::info_span!("monitor", address = %address);
        let handle = tokio::spawn(
            run_monitor(
                probe,
                address,
                options.interval,
                command_receiver,
                events.clone(),
                latest_sender,
            )
            .instrument(span),
        );

        Ok(Self {
            commands,
            events,
            latest,
            handle: Some(handle),
        })
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PingEvent> {
        self.events.subscribe()
    }

    /// State from the most recent probe, `None` before the first one ends.
    pub fn latest(&self) -> Option<ConnectionState> {
        *self.latest.borrow()
    }

    /// Watch channel that changes after every probe.
    pub fn watch(&self) -> watch::Receiver<Option<ConnectionState>> {
        self.latest.clone()
    }

    /// Stop the loop and wait for it to exit. A probe that is already running
    /// finishes first.
    pub async fn stop(mut self) {
        let _ = self.commands.send(MonitorCommand::Shutdown).await;
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!("Monitor task ended abnormally: {:?}", err);
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_monitor(
    probe: Arc<Probe>,
    address: String,
    interval: Duration,
    mut commands: mpsc::Receiver<MonitorCommand>,
    events: broadcast::Sender<PingEvent>,
    latest: watch::Sender<Option<ConnectionState>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Monitor started, interval {:?}", interval);

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(MonitorCommand::Shutdown) | None => break,
                }
            }
            _ = ticker.tick() => {
                let status = match Arc::clone(&probe)
                    .probe_async(Some(address.clone()))
                    .await
                {
                    Ok(status) => status,
                    Err(err) => {
                        // address was validated in `start`
                        warn!("Probe rejected address: {}", err);
                        break;
                    }
                };

                let event = PingEvent {
                    address: address.clone(),
                    status,
                    state: status.state(),
                    checked_at: SystemTime::now(),
                };
                latest.send_replace(Some(event.state));
                // no subscribers is fine
                let _ = events.send(event);
            }
        }
    }

    info!("Monitor stopped");
}
