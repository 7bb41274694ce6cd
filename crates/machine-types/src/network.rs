use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;

/// Address family of a single address assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpFamily {
    #[serde(rename = "ipv4")]
    V4,
    #[serde(rename = "ipv6")]
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// Network settings for one guest interface.
///
/// Produced per device by the resolver, merged per MAC address for dual-stack
/// devices and handed in order to the network-config renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceNetworkConfig {
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_gateway: Option<String>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

impl DeviceNetworkConfig {
    pub fn new(mac_address: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            ..Self::default()
        }
    }

    pub fn with_ipv4(mut self, address: impl Into<String>, gateway: impl Into<String>) -> Self {
        self.ipv4_address = Some(address.into());
        self.ipv4_gateway = Some(gateway.into());
        self
    }

    pub fn with_ipv6(mut self, address: impl Into<String>, gateway: impl Into<String>) -> Self {
        self.ipv6_address = Some(address.into());
        self.ipv6_gateway = Some(gateway.into());
        self
    }

    pub fn with_dns_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dns_servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Store an address and gateway under the given family, replacing any previous value.
    pub fn set_family(&mut self, family: IpFamily, address: Option<String>, gateway: Option<String>) {
        match family {
            IpFamily::V4 => {
                self.ipv4_address = address;
                self.ipv4_gateway = gateway;
            }
            IpFamily::V6 => {
                self.ipv6_address = address;
                self.ipv6_gateway = gateway;
            }
        }
    }

    /// Address and gateway configured for `family`.
    pub fn family(&self, family: IpFamily) -> (Option<&str>, Option<&str>) {
        match family {
            IpFamily::V4 => (self.ipv4_address.as_deref(), self.ipv4_gateway.as_deref()),
            IpFamily::V6 => (self.ipv6_address.as_deref(), self.ipv6_gateway.as_deref()),
        }
    }

    pub fn has_mac_address(&self) -> bool {
        !self.mac_address.is_empty()
    }

    pub fn has_address(&self) -> bool {
        non_empty(&self.ipv4_address) || non_empty(&self.ipv6_address)
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// An address claimed from an IP pool for one device of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedAddress {
    pub address: IpAddr,
    pub prefix: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

impl AllocatedAddress {
    pub fn new(address: IpAddr, prefix: u8, gateway: Option<String>) -> Self {
        Self {
            address,
            prefix,
            gateway,
        }
    }

    pub fn family(&self) -> IpFamily {
        if self.address.is_ipv6() {
            IpFamily::V6
        } else {
            IpFamily::V4
        }
    }

    /// CIDR notation of the claim, e.g. `10.10.10.12/24`.
    pub fn to_cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix)
    }

    pub fn to_ipnet(&self) -> Result<IpNet, SharedTypeError> {
        IpNet::new(self.address, self.prefix).map_err(|_| SharedTypeError::InvalidValue {
            field: "prefix",
            value: self.prefix.to_string(),
        })
    }
}

impl FromStr for AllocatedAddress {
    type Err = SharedTypeError;

    /// Parses `address/prefix`; a gateway is never part of the string form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: IpNet = s.parse().map_err(|_| SharedTypeError::InvalidValue {
            field: "address",
            value: s.to_string(),
        })?;
        Ok(Self::new(net.addr(), net.prefix_len(), None))
    }
}

/// Addresses reported in the machine status for one network device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

impl IpAddresses {
    pub fn is_empty(&self) -> bool {
        !non_empty(&self.ipv4) && !non_empty(&self.ipv6)
    }
}
