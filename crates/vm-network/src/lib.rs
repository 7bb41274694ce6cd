//! Proxmox VM network resolution
//!
//! Resolves MAC address and allocated addresses per VM network device and
//! assembles them into the ordered, dual-stack merged device list consumed by
//! the cloud-init network-config renderer.

pub mod assembler;
pub mod error;
pub mod extract;
pub mod naming;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use assembler::{merge_dual_stack, NetworkConfigAssembler};
pub use error::NetworkError;
pub use extract::{extract_mac_address, extract_uuid};
pub use naming::{base_device_name, DeviceNaming, DEFAULT_NETWORK_DEVICE};
pub use resolver::{all_devices_have_mac, AddressLookup, DeviceResolver, NetworkDeviceSource};

/// Result type for network resolution
pub type Result<T> = std::result::Result<T, NetworkError>;
