//! Interfaces to the systems a bootstrap pass talks to

use std::collections::BTreeMap;

use async_trait::async_trait;

use pve_cloudinit::Renderer;
use pve_machine_types::VirtualMachine;

/// A secret as returned by the cluster API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secret {
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Source of the bootstrap payload secret of a machine.
#[async_trait]
pub trait BootstrapSecretSource: Send + Sync {
    async fn get_bootstrap_secret(&self, secret_name: &str) -> anyhow::Result<Secret>;
}

/// Everything written into the VM's cloud-init media.
pub struct InjectionBundle {
    pub metadata: Box<dyn Renderer>,
    pub network: Box<dyn Renderer>,
    /// Bootstrap user-data, passed through unchanged.
    pub payload: Vec<u8>,
}

/// Writes cloud-init data into the boot media of a VM.
///
/// Implementations render both documents of the bundle and must fail without
/// touching the VM when rendering fails.
#[async_trait]
pub trait Injector: Send + Sync {
    async fn inject(&self, vm: &VirtualMachine, bundle: InjectionBundle) -> anyhow::Result<()>;
}
