//! Error types for network config assembly

use thiserror::Error;

/// Errors raised while resolving and assembling per-device network settings
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unable to extract mac address for device {device}")]
    MissingMacAddress { device: String },

    #[error("unable to find IPAddress, device={device}: {source}")]
    AddressLookupFailed {
        device: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "network device {device} ipv4 and ipv6 have different mac addresses ({ipv4_mac} != {ipv6_mac})"
    )]
    InconsistentDualStackMac {
        device: String,
        ipv4_mac: String,
        ipv6_mac: String,
    },
}

impl NetworkError {
    /// Lookups fail until the address claim has been fulfilled, so retrying
    /// later may succeed. Everything else needs a spec or VM change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NetworkError::AddressLookupFailed { .. })
    }

    /// Device name the error refers to.
    pub fn device(&self) -> &str {
        match self {
            NetworkError::MissingMacAddress { device }
            | NetworkError::AddressLookupFailed { device, .. }
            | NetworkError::InconsistentDualStackMac { device, .. } => device,
        }
    }
}
