//! cloud-init documents for Proxmox VMs
//!
//! Renders the `network-config` and `meta-data` files that are injected into
//! a VM before its first boot. Output is byte-stable for identical input.

pub mod error;
pub mod metadata;
pub mod network;

pub use error::{RenderError, Result};
pub use metadata::Metadata;
pub use network::{interface_name, Ethernet, NetworkConfig, NetworkConfigDocument, Route};

/// A cloud-init document that can be rendered to bytes.
pub trait Renderer: Send + Sync {
    /// Validate the input and produce the document.
    fn render(&self) -> Result<Vec<u8>>;
}
