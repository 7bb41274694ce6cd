//! Device naming shared with the address allocation side
//!
//! Addresses are claimed per device and address family under suffixed keys
//! (`net0-inet`, `net0-inet6`), while the VM config only knows the bare device
//! name. The suffixes are an external contract and therefore configurable.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NETWORK_DEVICE: &str = "net0";
pub const DEFAULT_IPV4_SUFFIX: &str = "inet";
pub const DEFAULT_IPV6_SUFFIX: &str = "inet6";

/// Separator between a device name and its address family suffix.
pub const SUFFIX_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceNaming {
    pub default_device: String,
    pub ipv4_suffix: String,
    pub ipv6_suffix: String,
}

impl Default for DeviceNaming {
    fn default() -> Self {
        Self {
            default_device: DEFAULT_NETWORK_DEVICE.to_string(),
            ipv4_suffix: DEFAULT_IPV4_SUFFIX.to_string(),
            ipv6_suffix: DEFAULT_IPV6_SUFFIX.to_string(),
        }
    }
}

impl DeviceNaming {
    /// Address claim key for the IPv4 address of `device`.
    pub fn ipv4_device(&self, device: &str) -> String {
        format!("{}{}{}", device, SUFFIX_SEPARATOR, self.ipv4_suffix)
    }

    /// Address claim key for the IPv6 address of `device`.
    pub fn ipv6_device(&self, device: &str) -> String {
        format!("{}{}{}", device, SUFFIX_SEPARATOR, self.ipv6_suffix)
    }

    pub fn default_ipv4_device(&self) -> String {
        self.ipv4_device(&self.default_device)
    }

    pub fn default_ipv6_device(&self) -> String {
        self.ipv6_device(&self.default_device)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_device.is_empty() || self.default_device.contains(SUFFIX_SEPARATOR) {
            return Err(format!("invalid default device '{}'", self.default_device));
        }
        if self.ipv4_suffix.is_empty() || self.ipv6_suffix.is_empty() {
            return Err("address family suffixes must not be empty".to_string());
        }
        if self.ipv4_suffix == self.ipv6_suffix {
            return Err(format!(
                "ipv4 and ipv6 suffix must differ, both are '{}'",
                self.ipv4_suffix
            ));
        }
        Ok(())
    }
}

/// Device name as known to the VM config, with any family suffix cut off.
pub fn base_device_name(device: &str) -> &str {
    device
        .split_once(SUFFIX_SEPARATOR)
        .map_or(device, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_names() {
        let naming = DeviceNaming::default();
        assert_eq!(naming.default_ipv4_device(), "net0-inet");
        assert_eq!(naming.default_ipv6_device(), "net0-inet6");
        assert_eq!(naming.ipv4_device("net2"), "net2-inet");
        assert!(naming.validate().is_ok());
    }

    #[test]
    fn test_base_device_name() {
        assert_eq!(base_device_name("net0-inet"), "net0");
        assert_eq!(base_device_name("net1-inet6"), "net1");
        assert_eq!(base_device_name("net1"), "net1");
        assert_eq!(base_device_name("net1-a-b"), "net1");
    }

    #[test]
    fn test_validate_rejects_equal_suffixes() {
        let naming = DeviceNaming {
            ipv6_suffix: "inet".to_string(),
            ..DeviceNaming::default()
        };
        assert!(naming.validate().is_err());
    }
}
