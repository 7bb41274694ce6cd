//! Shared records for Proxmox machine bootstrap
//!
//! Cluster and machine specs, machine status with its conditions, and the
//! per-device network records exchanged between the resolver, the renderer and
//! the bootstrap reconciler.

pub mod cluster;
pub mod conditions;
pub mod error;
pub mod machine;
pub mod network;

pub use cluster::{ClusterNetworkSpec, IpPoolSpec};
pub use conditions::{
    Condition, ConditionSeverity, ConditionStatus, CLONING_FAILED_REASON,
    VM_PROVISIONED_CONDITION, VM_PROVISION_FAILED_REASON, WAITING_FOR_STATIC_IP_ALLOCATION_REASON,
};
pub use error::{SharedResult, SharedTypeError};
pub use machine::{
    AdditionalNetworkDevice, Bootstrap, NetworkDevice, NetworkSpec, ProxmoxMachine,
    ProxmoxMachineSpec, ProxmoxMachineStatus, TypedLocalObjectReference, VirtualMachine,
    VirtualMachineConfig,
};
pub use network::{AllocatedAddress, DeviceNetworkConfig, IpAddresses, IpFamily};
