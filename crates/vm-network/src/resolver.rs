//! Per-device network resolution

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::{debug, error};

use pve_machine_types::{AllocatedAddress, DeviceNetworkConfig, IpFamily, VirtualMachineConfig};

use crate::error::NetworkError;
use crate::extract::extract_mac_address;
use crate::naming::base_device_name;
use crate::Result;

/// Live network device lines of a VM.
pub trait NetworkDeviceSource: Send + Sync {
    /// Device lines keyed by bare device name (`net0`, `net1`, ...).
    fn merged_nets(&self) -> BTreeMap<String, String>;
}

impl NetworkDeviceSource for VirtualMachineConfig {
    fn merged_nets(&self) -> BTreeMap<String, String> {
        VirtualMachineConfig::merged_nets(self)
    }
}

/// Read access to allocated addresses of a machine.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Address claimed for `device` (a suffixed claim key such as `net0-inet`).
    ///
    /// Fails when the claim does not exist or has not been fulfilled yet.
    async fn find_address(&self, device: &str) -> anyhow::Result<AllocatedAddress>;
}

/// Whether every network device of the VM already has a MAC address.
///
/// A VM without any network device is still being created.
pub fn all_devices_have_mac(source: &dyn NetworkDeviceSource) -> bool {
    let nets = source.merged_nets();
    !nets.is_empty() && nets.values().all(|line| extract_mac_address(line).is_some())
}

/// Resolves MAC, address and gateway of single devices.
pub struct DeviceResolver<'a> {
    source: &'a dyn NetworkDeviceSource,
    lookup: &'a dyn AddressLookup,
    dns_servers: &'a [String],
}

impl<'a> DeviceResolver<'a> {
    pub fn new(
        source: &'a dyn NetworkDeviceSource,
        lookup: &'a dyn AddressLookup,
        dns_servers: &'a [String],
    ) -> Self {
        Self {
            source,
            lookup,
            dns_servers,
        }
    }

    /// Resolve the `family` settings of `device`.
    ///
    /// The returned record carries only that family plus the cluster
    /// nameservers. `device` may be a suffixed claim key; the MAC address is
    /// looked up under the bare device name.
    pub async fn resolve(&self, device: &str, family: IpFamily) -> Result<DeviceNetworkConfig> {
        let nets = self.source.merged_nets();
        let base = base_device_name(device);

        let mac_address = match nets.get(base).and_then(|line| extract_mac_address(line)) {
            Some(mac) => mac,
            None => {
                error!("device {} has no mac address", device);
                return Err(NetworkError::MissingMacAddress {
                    device: device.to_string(),
                });
            }
        };

        let address = self.lookup.find_address(device).await.map_err(|source| {
            NetworkError::AddressLookupFailed {
                device: device.to_string(),
                source,
            }
        })?;

        debug!(
            "resolved device {} ({}): mac {} address {}",
            device,
            family,
            mac_address,
            address.to_cidr()
        );

        let gateway = address.gateway.clone().filter(|gw| !gw.is_empty());
        let mut config = DeviceNetworkConfig::new(mac_address)
            .with_dns_servers(self.dns_servers.iter().cloned());
        config.set_family(family, Some(address.to_cidr()), gateway);

        Ok(config)
    }
}
