//! Input policy for probe targets.
//!
//! Addresses are never truncated. Anything the policy does not accept is
//! rejected before a single packet is sent.
use crate::error::ProbeError;

pub const MAX_ADDRESS_LEN: usize =
    netprobe_config::settings::DEFAULT_MAX_ADDRESS_LEN;

/// Check `address` against the probe input policy and return it unchanged.
///
/// Rejected:
/// - empty strings
/// - strings longer than `max_len` bytes
/// - a leading `-`, which `ping` would read as an option
/// - whitespace and control characters
pub fn validate(address: &str, max_len: usize) -> Result<&str, ProbeError> {
    if address.is_empty() {
        return Err(ProbeError::EmptyAddress);
    }
    if address.len() > max_len {
        return Err(ProbeError::AddressTooLong {
            len: address.len(),
            max: max_len,
        });
    }
    if address.starts_with('-') {
        return Err(invalid(address, "must not start with '-'"));
    }
    if address.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(address, "contains whitespace or control characters"));
    }
    Ok(address)
}

fn invalid(address: &str, reason: &'static str) -> ProbeError {
    ProbeError::InvalidAddress {
        address: address.to_string(),
        reason,
    }
}
