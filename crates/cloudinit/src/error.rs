//! Rendering errors

use thiserror::Error;

/// Validation failures of cloud-init documents
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("network config data is not set")]
    MissingNetworkConfigData,

    #[error("mac address is not set for device #{index}")]
    MissingMacAddress { index: usize },

    #[error("ip address is not set for device #{index}")]
    MissingIpAddress { index: usize },

    #[error("malformed ip address '{address}' for device #{index}, expected address/prefix")]
    MalformedIpAddress { index: usize, address: String },

    #[error("gateway is not set for ip address '{address}' of device #{index}")]
    MissingGateway { index: usize, address: String },

    #[error("hostname is not set")]
    MissingHostname,
}

/// Result type for rendering
pub type Result<T> = std::result::Result<T, RenderError>;
