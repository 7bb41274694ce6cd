use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conditions::{get_condition, set_condition, Condition, ConditionSeverity};
use crate::network::IpAddresses;

/// Reference to an object in the same namespace, e.g. an IP pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedLocalObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
    pub kind: String,
    pub name: String,
}

impl TypedLocalObjectReference {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_group: None,
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// The default network device of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    pub bridge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A further network device attached to the VM, drawing from its own pools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalNetworkDevice {
    /// Device name on the hypervisor, e.g. `net1`.
    pub name: String,
    #[serde(default)]
    pub bridge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, rename = "ipv4PoolRef", skip_serializing_if = "Option::is_none")]
    pub ipv4_pool_ref: Option<TypedLocalObjectReference>,
    #[serde(default, rename = "ipv6PoolRef", skip_serializing_if = "Option::is_none")]
    pub ipv6_pool_ref: Option<TypedLocalObjectReference>,
    /// Overrides the cluster nameservers for this device when not empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
}

impl AdditionalNetworkDevice {
    pub fn new(name: impl Into<String>, bridge: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bridge: bridge.into(),
            ..Self::default()
        }
    }

    pub fn with_ipv4_pool(mut self, pool: TypedLocalObjectReference) -> Self {
        self.ipv4_pool_ref = Some(pool);
        self
    }

    pub fn with_ipv6_pool(mut self, pool: TypedLocalObjectReference) -> Self {
        self.ipv6_pool_ref = Some(pool);
        self
    }

    pub fn with_dns_servers(mut self, servers: Vec<String>) -> Self {
        self.dns_servers = servers;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<NetworkDevice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_devices: Vec<AdditionalNetworkDevice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxmoxMachineSpec {
    #[serde(default, rename = "virtualMachineID", skip_serializing_if = "Option::is_none")]
    pub virtual_machine_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxmoxMachineStatus {
    #[serde(default)]
    pub ready: bool,
    /// Allocated addresses per network device, keyed by device name (`net0`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ip_addresses: BTreeMap<String, IpAddresses>,
    /// Set once the cloud-init data has been written into the VM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_data_provided: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// The infrastructure machine record this subsystem reconciles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxmoxMachine {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub spec: ProxmoxMachineSpec,
    #[serde(default)]
    pub status: ProxmoxMachineStatus,
}

impl ProxmoxMachine {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// The network spec, or an empty one when the machine does not define any.
    pub fn network(&self) -> NetworkSpec {
        self.spec.network.clone().unwrap_or_default()
    }

    pub fn bootstrap_data_provided(&self) -> bool {
        self.status.bootstrap_data_provided.unwrap_or(false)
    }

    /// Whether the machine has a usable address on `device`.
    pub fn has_ip_address(&self, device: &str) -> bool {
        self.status
            .ip_addresses
            .get(device)
            .is_some_and(|addresses| !addresses.is_empty())
    }

    pub fn mark_false(
        &mut self,
        type_: &str,
        reason: &str,
        severity: ConditionSeverity,
        message: impl Into<String>,
    ) {
        set_condition(
            &mut self.status.conditions,
            Condition::new_false(type_, reason, severity, message),
        );
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        get_condition(&self.status.conditions, type_)
    }
}

/// Bootstrap settings of the owning Cluster API Machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_secret_name: Option<String>,
}

/// Live configuration of a VM as reported by the hypervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineConfig {
    /// `netN` entries, e.g. `net0 => virtio=A6:23:64:4D:84:CB,bridge=vmbr0`.
    #[serde(default)]
    pub nets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smbios1: Option<String>,
}

impl VirtualMachineConfig {
    pub fn with_net(mut self, device: impl Into<String>, line: impl Into<String>) -> Self {
        self.nets.insert(device.into(), line.into());
        self
    }

    pub fn with_smbios1(mut self, smbios1: impl Into<String>) -> Self {
        self.smbios1 = Some(smbios1.into());
        self
    }

    /// All network device lines keyed by device name.
    pub fn merged_nets(&self) -> BTreeMap<String, String> {
        self.nets
            .iter()
            .filter(|(name, _)| is_net_device(name))
            .map(|(name, line)| (name.clone(), line.clone()))
            .collect()
    }
}

fn is_net_device(name: &str) -> bool {
    name.strip_prefix("net")
        .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
}

/// A VM on a Proxmox node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub vmid: u64,
    pub node: String,
    pub name: String,
    #[serde(default)]
    pub config: VirtualMachineConfig,
}
