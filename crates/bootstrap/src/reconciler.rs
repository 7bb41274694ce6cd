//! Bootstrap reconciliation
//!
//! A pass runs a fixed sequence of steps and injects the cloud-init data at
//! most once per machine. The `bootstrap_data_provided` status flag is the
//! only record of a completed injection: it is read on entry and set after a
//! successful injection, never reset.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use pve_cloudinit::{Metadata, NetworkConfig};
use pve_machine_types::{
    Bootstrap, ConditionSeverity, ProxmoxMachine, VM_PROVISIONED_CONDITION,
    WAITING_FOR_STATIC_IP_ALLOCATION_REASON,
};
use pve_vm_network::{
    all_devices_have_mac, extract_uuid, AddressLookup, DeviceResolver, NetworkConfigAssembler,
};

use crate::collaborators::{BootstrapSecretSource, InjectionBundle, Injector};
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::scope::MachineScope;

/// Steps of a bootstrap pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapPhase {
    AlreadyProvisioned,
    AwaitingAddress,
    AwaitingMac,
    FetchingPayload,
    BuildingNetworkConfig,
    Injecting,
    Provisioned,
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            BootstrapPhase::AlreadyProvisioned => "already provisioned",
            BootstrapPhase::AwaitingAddress => "awaiting ip address",
            BootstrapPhase::AwaitingMac => "awaiting mac addresses",
            BootstrapPhase::FetchingPayload => "fetching bootstrap data",
            BootstrapPhase::BuildingNetworkConfig => "building network config",
            BootstrapPhase::Injecting => "injecting cloud-init data",
            BootstrapPhase::Provisioned => "provisioned",
        };
        f.write_str(phase)
    }
}

/// Successful end of a bootstrap pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Injection happened in an earlier pass
    AlreadyProvisioned,
    /// The default device has no allocated address yet
    AwaitingAddress,
    /// The VM has network devices without a MAC address, or none at all
    AwaitingMac,
    /// Injection happened in this pass
    Provisioned,
}

impl BootstrapOutcome {
    /// Whether the caller should schedule another pass.
    pub fn requeue(&self) -> bool {
        matches!(
            self,
            BootstrapOutcome::AwaitingAddress | BootstrapOutcome::AwaitingMac
        )
    }

    pub fn phase(&self) -> BootstrapPhase {
        match self {
            BootstrapOutcome::AlreadyProvisioned => BootstrapPhase::AlreadyProvisioned,
            BootstrapOutcome::AwaitingAddress => BootstrapPhase::AwaitingAddress,
            BootstrapOutcome::AwaitingMac => BootstrapPhase::AwaitingMac,
            BootstrapOutcome::Provisioned => BootstrapPhase::Provisioned,
        }
    }
}

/// Drives machines to the point where their cloud-init data is in place.
///
/// Collaborators are shared, so one reconciler serves many machines
/// concurrently. Passes for the same machine must not overlap.
pub struct BootstrapReconciler {
    secrets: Arc<dyn BootstrapSecretSource>,
    addresses: Arc<dyn AddressLookup>,
    injector: Arc<dyn Injector>,
    config: BootstrapConfig,
}

impl BootstrapReconciler {
    pub fn new(
        secrets: Arc<dyn BootstrapSecretSource>,
        addresses: Arc<dyn AddressLookup>,
        injector: Arc<dyn Injector>,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            secrets,
            addresses,
            injector,
            config,
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Run one bootstrap pass for the machine in `scope`.
    ///
    /// Transient waits return `Ok` with [`BootstrapOutcome::requeue`] set.
    /// Failures are reported on the `VMProvisioned` condition of the machine
    /// and returned. Cancelling `cancel` aborts the pending step with
    /// [`BootstrapError::Cancelled`] and leaves the machine status untouched.
    pub async fn reconcile_bootstrap(
        &self,
        scope: &mut MachineScope,
        cancel: &CancellationToken,
    ) -> Result<BootstrapOutcome> {
        if scope.machine.bootstrap_data_provided() {
            debug!("machine {} already has its bootstrap data", scope.name());
            return Ok(BootstrapOutcome::AlreadyProvisioned);
        }

        debug!("bootstrapping machine {}", scope.name());

        if !scope.machine.has_ip_address(&self.config.naming.default_device) {
            scope.machine.mark_false(
                VM_PROVISIONED_CONDITION,
                WAITING_FOR_STATIC_IP_ALLOCATION_REASON,
                ConditionSeverity::Warning,
                "no ip address",
            );
            debug!("machine {} has no ip address yet", scope.name());
            return Ok(BootstrapOutcome::AwaitingAddress);
        }

        if !all_devices_have_mac(&scope.vm.config) {
            debug!(
                "vm {} of machine {} has network devices without mac address",
                scope.vm.vmid,
                scope.name()
            );
            return Ok(BootstrapOutcome::AwaitingMac);
        }

        let fetched = until_cancelled(
            cancel,
            BootstrapPhase::FetchingPayload,
            self.fetch_payload(&scope.bootstrap),
        )
        .await?;
        let payload = match fetched {
            Ok(payload) => payload,
            Err(err) => return Err(report(&mut scope.machine, err)),
        };

        let instance_id = match scope.vm.config.smbios1.as_deref().and_then(extract_uuid) {
            Some(uuid) => uuid.to_string(),
            None => {
                warn!(
                    "vm {} has no smbios uuid, rendering empty instance id",
                    scope.vm.vmid
                );
                String::new()
            }
        };

        let network = scope.machine.network();
        let assembled = {
            let resolver = DeviceResolver::new(
                &scope.vm.config,
                self.addresses.as_ref(),
                &scope.cluster.dns_servers,
            );
            let assembler =
                NetworkConfigAssembler::new(resolver, &scope.cluster, &self.config.naming);
            until_cancelled(
                cancel,
                BootstrapPhase::BuildingNetworkConfig,
                assembler.assemble(&network),
            )
            .await?
        };
        let devices = match assembled {
            Ok(devices) => devices,
            Err(err) => return Err(report(&mut scope.machine, err.into())),
        };

        let bundle = InjectionBundle {
            metadata: Box::new(Metadata::new(instance_id, scope.machine.name.clone())),
            network: Box::new(NetworkConfig::new(devices)),
            payload,
        };
        let injected = until_cancelled(
            cancel,
            BootstrapPhase::Injecting,
            self.injector.inject(&scope.vm, bundle),
        )
        .await?;
        if let Err(err) = injected {
            return Err(report(&mut scope.machine, BootstrapError::Inject(err)));
        }

        scope.machine.status.bootstrap_data_provided = Some(true);
        info!(
            "injected cloud-init data into vm {} of machine {}",
            scope.vm.vmid,
            scope.name()
        );
        Ok(BootstrapOutcome::Provisioned)
    }

    async fn fetch_payload(&self, bootstrap: &Bootstrap) -> Result<Vec<u8>> {
        let secret_name = bootstrap
            .data_secret_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or(BootstrapError::MissingBootstrapData)?;

        let secret = self
            .secrets
            .get_bootstrap_secret(secret_name)
            .await
            .map_err(|source| BootstrapError::SecretRetrieval {
                secret: secret_name.to_string(),
                source,
            })?;

        secret
            .data
            .get(&self.config.secret_value_key)
            .cloned()
            .ok_or_else(|| BootstrapError::MissingSecretValue {
                secret: secret_name.to_string(),
                key: self.config.secret_value_key.clone(),
            })
    }
}

/// Run `step` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    phase: BootstrapPhase,
    step: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("bootstrap cancelled while {}", phase);
            Err(BootstrapError::Cancelled { phase })
        }
        output = step => Ok(output),
    }
}

/// Record `err` on the machine's `VMProvisioned` condition.
fn report(machine: &mut ProxmoxMachine, err: BootstrapError) -> BootstrapError {
    error!("bootstrap of machine {} failed: {}", machine.name, err);
    if let Some(reason) = err.reason() {
        machine.mark_false(
            VM_PROVISIONED_CONDITION,
            reason,
            ConditionSeverity::Warning,
            err.to_string(),
        );
    }
    err
}
