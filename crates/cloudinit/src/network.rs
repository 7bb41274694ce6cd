//! cloud-init network-config (version 2) rendering
//!
//! Consumers diff and hash the rendered document, so the output is written
//! by hand with a fixed key order, quoting and indentation instead of going
//! through a generic YAML serializer.

use indexmap::IndexMap;
use ipnet::IpNet;
use log::debug;

use pve_machine_types::{DeviceNetworkConfig, IpFamily};

use crate::error::{RenderError, Result};
use crate::Renderer;

/// Schema version of the rendered network-config.
pub const NETWORK_CONFIG_VERSION: u8 = 2;
/// Backend the guest uses to apply the config.
pub const NETWORK_RENDERER: &str = "networkd";
/// Interfaces are named `eth0`, `eth1`, ... in device order.
pub const INTERFACE_BASE_NAME: &str = "eth";

const INDENT: &str = "  ";

/// A default route over one gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub to: String,
    pub via: String,
}

/// One `ethernets` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ethernet {
    pub mac_address: String,
    pub dhcp4: bool,
    pub addresses: Vec<String>,
    pub routes: Vec<Route>,
    pub nameservers: Vec<String>,
}

/// Validated network-config document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfigDocument {
    pub version: u8,
    pub renderer: String,
    pub ethernets: IndexMap<String, Ethernet>,
}

/// Renders the ordered device list of a machine into a network-config.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    devices: Vec<DeviceNetworkConfig>,
}

impl NetworkConfig {
    pub fn new(devices: Vec<DeviceNetworkConfig>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[DeviceNetworkConfig] {
        &self.devices
    }

    /// Validate every device and build the document model.
    ///
    /// Devices are checked in order and the first violation is returned.
    pub fn document(&self) -> Result<NetworkConfigDocument> {
        if self.devices.is_empty() {
            return Err(RenderError::MissingNetworkConfigData);
        }

        let mut ethernets = IndexMap::with_capacity(self.devices.len());
        for (index, device) in self.devices.iter().enumerate() {
            let ethernet = build_ethernet(index, device)?;
            ethernets.insert(interface_name(index), ethernet);
        }

        Ok(NetworkConfigDocument {
            version: NETWORK_CONFIG_VERSION,
            renderer: NETWORK_RENDERER.to_string(),
            ethernets,
        })
    }
}

impl Renderer for NetworkConfig {
    fn render(&self) -> Result<Vec<u8>> {
        let document = self.document()?;
        debug!(
            "rendering network-config with {} interface(s)",
            document.ethernets.len()
        );
        Ok(document.to_yaml().into_bytes())
    }
}

/// Name of the interface at `index`.
pub fn interface_name(index: usize) -> String {
    format!("{}{}", INTERFACE_BASE_NAME, index)
}

fn build_ethernet(index: usize, device: &DeviceNetworkConfig) -> Result<Ethernet> {
    if !device.has_mac_address() {
        return Err(RenderError::MissingMacAddress { index });
    }
    if !device.has_address() {
        return Err(RenderError::MissingIpAddress { index });
    }

    let mut ethernet = Ethernet {
        mac_address: device.mac_address.clone(),
        dhcp4: false,
        addresses: Vec::new(),
        routes: Vec::new(),
        nameservers: device.dns_servers.clone(),
    };

    for family in [IpFamily::V4, IpFamily::V6] {
        let (address, gateway) = match device.family(family) {
            (Some(address), gateway) if !address.is_empty() => (address, gateway),
            _ => continue,
        };

        if address.parse::<IpNet>().is_err() {
            return Err(RenderError::MalformedIpAddress {
                index,
                address: address.to_string(),
            });
        }

        let gateway = match gateway {
            Some(gateway) if !gateway.is_empty() => gateway,
            _ => {
                return Err(RenderError::MissingGateway {
                    index,
                    address: address.to_string(),
                })
            }
        };

        ethernet.addresses.push(address.to_string());
        ethernet.routes.push(Route {
            to: "default".to_string(),
            via: gateway.to_string(),
        });
    }

    Ok(ethernet)
}

impl NetworkConfigDocument {
    /// Serialize with two-space indentation and indented block sequences.
    pub fn to_yaml(&self) -> String {
        let mut lines = vec![
            "network:".to_string(),
            format!("{}version: {}", indent(1), self.version),
            format!("{}renderer: {}", indent(1), self.renderer),
            format!("{}ethernets:", indent(1)),
        ];

        for (name, ethernet) in &self.ethernets {
            lines.push(format!("{}{}:", indent(2), name));
            ethernet.write_lines(&mut lines);
        }

        lines.join("\n")
    }
}

impl Ethernet {
    fn write_lines(&self, lines: &mut Vec<String>) {
        lines.push(format!("{}match:", indent(3)));
        lines.push(format!("{}macaddress: {}", indent(4), self.mac_address));
        lines.push(format!("{}dhcp4: {}", indent(3), yes_no(self.dhcp4)));

        if !self.addresses.is_empty() {
            lines.push(format!("{}addresses:", indent(3)));
            for address in &self.addresses {
                lines.push(format!("{}- {}", indent(4), address));
            }
        }

        if !self.routes.is_empty() {
            lines.push(format!("{}routes:", indent(3)));
            for route in &self.routes {
                lines.push(format!("{}- to: {}", indent(4), route.to));
                lines.push(format!("{}  via: {}", indent(4), route.via));
            }
        }

        if !self.nameservers.is_empty() {
            lines.push(format!("{}nameservers:", indent(3)));
            lines.push(format!("{}addresses:", indent(4)));
            for server in &self.nameservers {
                lines.push(format!("{}- {}", indent(5), server));
            }
        }
    }
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

// quoted, so YAML 1.1 parsers keep it a string
fn yes_no(value: bool) -> &'static str {
    if value {
        "'yes'"
    } else {
        "'no'"
    }
}
