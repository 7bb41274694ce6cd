//! Bootstrap reconciliation for Proxmox machines
//!
//! Waits until a machine's VM has its addresses and MAC addresses, then
//! renders the cloud-init documents and injects them together with the
//! bootstrap payload into the VM, exactly once.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod scope;


pub use collaborators::{BootstrapSecretSource, InjectionBundle, Injector, Secret};
pub use config::{BootstrapConfig, ConfigError};
pub use error::{BootstrapError, Result};
pub use reconciler::{BootstrapOutcome, BootstrapPhase, BootstrapReconciler};
pub use scope::MachineScope;
