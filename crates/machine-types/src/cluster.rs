use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

/// Address pool a cluster draws machine addresses from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpPoolSpec {
    /// Ranges, CIDRs or single addresses handed to the in-cluster IPAM provider.
    #[serde(default)]
    pub addresses: Vec<String>,
    pub prefix: u8,
    pub gateway: String,
}

impl IpPoolSpec {
    pub fn new(addresses: Vec<String>, prefix: u8, gateway: impl Into<String>) -> Self {
        Self {
            addresses,
            prefix,
            gateway: gateway.into(),
        }
    }
}

/// Network portion of a ProxmoxCluster spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkSpec {
    #[serde(default, rename = "ipv4Config", skip_serializing_if = "Option::is_none")]
    pub ipv4_config: Option<IpPoolSpec>,
    #[serde(default, rename = "ipv6Config", skip_serializing_if = "Option::is_none")]
    pub ipv6_config: Option<IpPoolSpec>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

impl ClusterNetworkSpec {
    pub fn is_dual_stack(&self) -> bool {
        self.ipv4_config.is_some() && self.ipv6_config.is_some()
    }

    /// Checks the admission rules of the cluster resource: at least one pool,
    /// every configured pool with addresses, and at least one nameserver.
    pub fn validate(&self) -> SharedResult<()> {
        if self.ipv4_config.is_none() && self.ipv6_config.is_none() {
            return Err(SharedTypeError::MissingField("ipv4Config or ipv6Config"));
        }

        for (field, pool) in [
            ("ipv4Config.addresses", &self.ipv4_config),
            ("ipv6Config.addresses", &self.ipv6_config),
        ] {
            if let Some(pool) = pool {
                if pool.addresses.is_empty() {
                    return Err(SharedTypeError::MissingField(field));
                }
            }
        }

        if self.dns_servers.is_empty() {
            return Err(SharedTypeError::MissingField("dnsServers"));
        }

        Ok(())
    }
}
