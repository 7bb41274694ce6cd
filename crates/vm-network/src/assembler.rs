//! Assembly of the ordered device list handed to the network-config renderer

use log::{debug, warn};

use pve_machine_types::{
    AdditionalNetworkDevice, ClusterNetworkSpec, DeviceNetworkConfig, IpFamily, NetworkSpec,
};

use crate::error::NetworkError;
use crate::naming::DeviceNaming;
use crate::resolver::DeviceResolver;
use crate::Result;

/// Builds the per-interface records of a machine: the default device first,
/// then the additional devices in spec order.
pub struct NetworkConfigAssembler<'a> {
    resolver: DeviceResolver<'a>,
    cluster: &'a ClusterNetworkSpec,
    naming: &'a DeviceNaming,
}

impl<'a> NetworkConfigAssembler<'a> {
    pub fn new(
        resolver: DeviceResolver<'a>,
        cluster: &'a ClusterNetworkSpec,
        naming: &'a DeviceNaming,
    ) -> Self {
        Self {
            resolver,
            cluster,
            naming,
        }
    }

    /// Resolve every configured device. Any failure aborts the whole assembly.
    pub async fn assemble(&self, network: &NetworkSpec) -> Result<Vec<DeviceNetworkConfig>> {
        let mut configs = Vec::with_capacity(1 + network.additional_devices.len());

        match self.default_device().await? {
            Some(config) => configs.push(config),
            None => warn!(
                "cluster has neither ipv4 nor ipv6 config, skipping default device {}",
                self.naming.default_device
            ),
        }

        for device in &network.additional_devices {
            if let Some(config) = self.additional_device(device).await? {
                configs.push(config);
            }
        }

        debug!("assembled network config for {} device(s)", configs.len());
        Ok(configs)
    }

    async fn default_device(&self) -> Result<Option<DeviceNetworkConfig>> {
        let ipv4 = match self.cluster.ipv4_config {
            Some(_) => Some(
                self.resolver
                    .resolve(&self.naming.default_ipv4_device(), IpFamily::V4)
                    .await?,
            ),
            None => None,
        };

        let ipv6 = match self.cluster.ipv6_config {
            Some(_) => Some(
                self.resolver
                    .resolve(&self.naming.default_ipv6_device(), IpFamily::V6)
                    .await?,
            ),
            None => None,
        };

        let config = merge_dual_stack(&self.naming.default_device, ipv4, ipv6)?;
        Ok(config.filter(DeviceNetworkConfig::has_mac_address))
    }

    async fn additional_device(
        &self,
        device: &AdditionalNetworkDevice,
    ) -> Result<Option<DeviceNetworkConfig>> {
        let ipv4 = match device.ipv4_pool_ref {
            Some(_) => Some(
                self.resolver
                    .resolve(&self.naming.ipv4_device(&device.name), IpFamily::V4)
                    .await?,
            ),
            None => None,
        };

        let ipv6 = match device.ipv6_pool_ref {
            Some(_) => Some(
                self.resolver
                    .resolve(&self.naming.ipv6_device(&device.name), IpFamily::V6)
                    .await?,
            ),
            None => None,
        };

        let config = merge_dual_stack(&device.name, ipv4, ipv6)?.map(|mut config| {
            if !device.dns_servers.is_empty() {
                config.dns_servers = device.dns_servers.clone();
            }
            config
        });

        if config.is_none() {
            debug!("device {} has no address pool, skipping", device.name);
        }

        Ok(config.filter(DeviceNetworkConfig::has_mac_address))
    }
}

/// Merge the IPv4 and IPv6 resolutions of one physical device.
///
/// Either side may be absent. When both are present and carry a MAC address,
/// the MAC addresses must match; the IPv4 record is then extended with the
/// IPv6 address and gateway.
pub fn merge_dual_stack(
    device: &str,
    ipv4: Option<DeviceNetworkConfig>,
    ipv6: Option<DeviceNetworkConfig>,
) -> Result<Option<DeviceNetworkConfig>> {
    match (ipv4, ipv6) {
        (ipv4, None) => Ok(ipv4),
        (None, Some(ipv6)) => Ok(Some(ipv6)),
        (Some(ipv4), Some(ipv6)) if !ipv4.has_mac_address() => Ok(Some(ipv6)),
        (Some(ipv4), Some(ipv6)) if ipv4.mac_address != ipv6.mac_address => {
            Err(NetworkError::InconsistentDualStackMac {
                device: device.to_string(),
                ipv4_mac: ipv4.mac_address,
                ipv6_mac: ipv6.mac_address,
            })
        }
        (Some(mut merged), Some(ipv6)) => {
            merged.set_family(IpFamily::V6, ipv6.ipv6_address, ipv6.ipv6_gateway);
            Ok(Some(merged))
        }
    }
}
