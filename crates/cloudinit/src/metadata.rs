//! cloud-init meta-data rendering

use log::debug;

use crate::error::{RenderError, Result};
use crate::Renderer;

/// Instance meta-data of a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    instance_id: String,
    hostname: String,
}

impl Metadata {
    /// `instance_id` may be empty when the VM exposes no SMBIOS uuid.
    pub fn new(instance_id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            hostname: hostname.into(),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl Renderer for Metadata {
    fn render(&self) -> Result<Vec<u8>> {
        if self.hostname.is_empty() {
            return Err(RenderError::MissingHostname);
        }

        debug!("rendering meta-data for instance {}", self.instance_id);
        let document = format!(
            "instance-id: {}\nlocal-hostname: {}\nhostname: {}",
            self.instance_id, self.hostname, self.hostname
        );
        Ok(document.into_bytes())
    }
}
