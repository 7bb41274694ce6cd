//! Value extraction from Proxmox VM config lines

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

/// A MAC address following `=` in a `netN` line, e.g. `virtio=A6:23:64:4D:84:CB,bridge=vmbr0`.
const MAC_IN_NET_REGEX: &str = r"=((?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2})(?:,|$)";

/// The `uuid=` property of an `smbios1` line.
const SMBIOS_UUID_REGEX: &str = r"(?:^|,)uuid=([0-9A-Fa-f-]+)";

fn mac_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(MAC_IN_NET_REGEX).expect("valid mac regex"))
}

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SMBIOS_UUID_REGEX).expect("valid uuid regex"))
}

/// MAC address of a network device line, as written in the VM config.
pub fn extract_mac_address(net: &str) -> Option<String> {
    mac_regex()
        .captures(net)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// SMBIOS uuid of the VM, used as cloud-init instance id.
pub fn extract_uuid(smbios1: &str) -> Option<Uuid> {
    uuid_regex()
        .captures(smbios1)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Uuid::parse_str(m.as_str()).ok())
}
