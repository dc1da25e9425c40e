use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single probe.
///
/// The integer codes are the ones handed to callers that only understand a
/// plain status number: `0` reachable, `-1` the fallback client could not be
/// created, `-2` both the echo and the fallback request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Reachable,
    ProbeInfrastructureUnavailable,
    UnreachableViaBothMethods,
}

impl ProbeStatus {
    pub const REACHABLE: i32 = 0;
    pub const HARD_FAILURE: i32 = -1;
    pub const SOFT_FAILURE: i32 = -2;

    pub fn code(self) -> i32 {
        match self {
            ProbeStatus::Reachable => Self::REACHABLE,
            ProbeStatus::ProbeInfrastructureUnavailable => Self::HARD_FAILURE,
            ProbeStatus::UnreachableViaBothMethods => Self::SOFT_FAILURE,
        }
    }

    pub fn is_reachable(self) -> bool {
        self == ProbeStatus::Reachable
    }

    pub fn state(self) -> ConnectionState {
        if self.is_reachable() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

impl From<ProbeStatus> for i32 {
    fn from(status: ProbeStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i32> for ProbeStatus {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            Self::REACHABLE => Ok(ProbeStatus::Reachable),
            Self::HARD_FAILURE => Ok(ProbeStatus::ProbeInfrastructureUnavailable),
            Self::SOFT_FAILURE => Ok(ProbeStatus::UnreachableViaBothMethods),
            other => Err(other),
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStatus::Reachable => "reachable",
            ProbeStatus::ProbeInfrastructureUnavailable => {
                "probe infrastructure unavailable"
            }
            ProbeStatus::UnreachableViaBothMethods => "unreachable",
        };
        f.write_str(s)
    }
}

/// Two-valued view of a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => f.write_str("CONNECTED"),
            ConnectionState::Disconnected => f.write_str("DISCONNECTED"),
        }
    }
}
