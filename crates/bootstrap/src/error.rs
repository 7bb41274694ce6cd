//! Error types for bootstrap reconciliation

use thiserror::Error;

use pve_machine_types::{
    CLONING_FAILED_REASON, VM_PROVISION_FAILED_REASON, WAITING_FOR_STATIC_IP_ALLOCATION_REASON,
};
use pve_vm_network::NetworkError;

use crate::reconciler::BootstrapPhase;

/// Failures of a bootstrap pass
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("machine has no bootstrap data")]
    MissingBootstrapData,

    #[error("failed to retrieve bootstrap data secret {secret}: {source}")]
    SecretRetrieval {
        secret: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("bootstrap data secret {secret} has no '{key}' key")]
    MissingSecretValue { secret: String, key: String },

    #[error("unable to assemble network config: {0}")]
    Network(#[from] NetworkError),

    #[error("cloud-init iso inject failed: {0}")]
    Inject(#[source] anyhow::Error),

    #[error("bootstrap cancelled while {phase}")]
    Cancelled { phase: BootstrapPhase },
}

impl BootstrapError {
    /// Reason of the `VMProvisioned` condition this failure is reported under.
    /// Cancellation leaves the conditions alone.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            BootstrapError::MissingBootstrapData
            | BootstrapError::SecretRetrieval { .. }
            | BootstrapError::MissingSecretValue { .. } => Some(CLONING_FAILED_REASON),
            BootstrapError::Network(_) => Some(WAITING_FOR_STATIC_IP_ALLOCATION_REASON),
            BootstrapError::Inject(_) => Some(VM_PROVISION_FAILED_REASON),
            BootstrapError::Cancelled { .. } => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            BootstrapError::Network(err) => err.is_retryable(),
            BootstrapError::SecretRetrieval { .. } | BootstrapError::Cancelled { .. } => true,
            _ => false,
        }
    }
}

/// Result type for bootstrap reconciliation
pub type Result<T> = std::result::Result<T, BootstrapError>;
