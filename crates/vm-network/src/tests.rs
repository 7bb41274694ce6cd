//! Network assembly tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use pve_machine_types::{
    AdditionalNetworkDevice, AllocatedAddress, ClusterNetworkSpec, IpPoolSpec, NetworkSpec,
    TypedLocalObjectReference, VirtualMachineConfig,
};

use crate::*;

/// Address lookup backed by a fixed table, recording every requested device.
pub(crate) struct StaticAddressLookup {
    addresses: HashMap<String, AllocatedAddress>,
    requested: Mutex<Vec<String>>,
}

impl StaticAddressLookup {
    pub(crate) fn new() -> Self {
        Self {
            addresses: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with(mut self, device: &str, cidr: &str, gateway: &str) -> Self {
        let mut address: AllocatedAddress = cidr.parse().unwrap();
        address.gateway = Some(gateway.to_string());
        self.addresses.insert(device.to_string(), address);
        self
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressLookup for StaticAddressLookup {
    async fn find_address(&self, device: &str) -> anyhow::Result<AllocatedAddress> {
        self.requested.lock().unwrap().push(device.to_string());
        self.addresses
            .get(device)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("IPAddress for device {} not found", device))
    }
}

pub(crate) fn vm_config(nets: &[(&str, &str)]) -> VirtualMachineConfig {
    nets.iter().fold(VirtualMachineConfig::default(), |config, (name, line)| {
        config.with_net(*name, *line)
    })
}

pub(crate) fn dns() -> Vec<String> {
    vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()]
}

fn ipv4_pool() -> IpPoolSpec {
    IpPoolSpec::new(vec!["10.10.10.10-10.10.10.20".to_string()], 24, "10.10.10.1")
}

fn ipv6_pool() -> IpPoolSpec {
    IpPoolSpec::new(vec!["2001:db8::10-2001:db8::20".to_string()], 64, "2001:db8::1")
}

fn cluster(ipv4: bool, ipv6: bool) -> ClusterNetworkSpec {
    ClusterNetworkSpec {
        ipv4_config: ipv4.then(ipv4_pool),
        ipv6_config: ipv6.then(ipv6_pool),
        dns_servers: dns(),
    }
}

fn pool(name: &str) -> TypedLocalObjectReference {
    TypedLocalObjectReference::new("InClusterIPPool", name)
}

async fn assemble(
    vm: &VirtualMachineConfig,
    lookup: &StaticAddressLookup,
    cluster: &ClusterNetworkSpec,
    network: &NetworkSpec,
) -> Result<Vec<pve_machine_types::DeviceNetworkConfig>> {
    let naming = DeviceNaming::default();
    let resolver = DeviceResolver::new(vm, lookup, &cluster.dns_servers);
    NetworkConfigAssembler::new(resolver, cluster, &naming)
        .assemble(network)
        .await
}

#[tokio::test]
async fn test_default_device_ipv4_only() {
    let _ = env_logger::builder().is_test(true).try_init();

    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new().with("net0-inet", "10.10.10.12/24", "10.10.10.1");

    let configs = assemble(&vm, &lookup, &cluster(true, false), &NetworkSpec::default())
        .await
        .unwrap();

    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].mac_address, "92:60:a0:5b:22:c2");
    assert_eq!(configs[0].ipv4_address.as_deref(), Some("10.10.10.12/24"));
    assert!(configs[0].ipv6_address.is_none());
    assert_eq!(configs[0].dns_servers, dns());
}

#[tokio::test]
async fn test_default_device_ipv6_only() {
    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new().with("net0-inet6", "2001:db8::12/64", "2001:db8::1");

    let configs = assemble(&vm, &lookup, &cluster(false, true), &NetworkSpec::default())
        .await
        .unwrap();

    assert_eq!(configs.len(), 1);
    assert!(configs[0].ipv4_address.is_none());
    assert_eq!(configs[0].ipv6_address.as_deref(), Some("2001:db8::12/64"));
    assert_eq!(lookup.requested(), vec!["net0-inet6"]);
}

#[tokio::test]
async fn test_default_device_dual_stack_merged() {
    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new()
        .with("net0-inet", "10.10.10.12/24", "10.10.10.1")
        .with("net0-inet6", "2001:db8::12/64", "2001:db8::1");

    let configs = assemble(&vm, &lookup, &cluster(true, true), &NetworkSpec::default())
        .await
        .unwrap();

    assert_eq!(configs.len(), 1);
    let config = &configs[0];
    assert_eq!(config.mac_address, "92:60:a0:5b:22:c2");
    assert_eq!(config.ipv4_address.as_deref(), Some("10.10.10.12/24"));
    assert_eq!(config.ipv4_gateway.as_deref(), Some("10.10.10.1"));
    assert_eq!(config.ipv6_address.as_deref(), Some("2001:db8::12/64"));
    assert_eq!(config.ipv6_gateway.as_deref(), Some("2001:db8::1"));
    assert_eq!(lookup.requested(), vec!["net0-inet", "net0-inet6"]);
}

#[tokio::test]
async fn test_additional_devices_in_spec_order() {
    let vm = vm_config(&[
        ("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0"),
        ("net1", "virtio=b4:87:18:bf:a3:60,bridge=vmbr1"),
        ("net2", "virtio=b4:87:18:bf:a3:61,bridge=vmbr2"),
    ]);
    let lookup = StaticAddressLookup::new()
        .with("net0-inet", "10.10.10.12/24", "10.10.10.1")
        .with("net2-inet", "172.16.0.5/16", "172.16.0.1")
        .with("net1-inet", "196.168.100.124/24", "196.168.100.254")
        .with("net1-inet6", "2001:db8:1::5/64", "2001:db8:1::1");

    let network = NetworkSpec {
        default: None,
        additional_devices: vec![
            AdditionalNetworkDevice::new("net2", "vmbr2").with_ipv4_pool(pool("pool-c")),
            AdditionalNetworkDevice::new("net1", "vmbr1")
                .with_ipv4_pool(pool("pool-a"))
                .with_ipv6_pool(pool("pool-a6")),
        ],
    };

    let configs = assemble(&vm, &lookup, &cluster(true, false), &network)
        .await
        .unwrap();

    let macs: Vec<_> = configs.iter().map(|c| c.mac_address.as_str()).collect();
    assert_eq!(
        macs,
        vec!["92:60:a0:5b:22:c2", "b4:87:18:bf:a3:61", "b4:87:18:bf:a3:60"]
    );
    assert_eq!(configs[2].ipv4_address.as_deref(), Some("196.168.100.124/24"));
    assert_eq!(configs[2].ipv6_address.as_deref(), Some("2001:db8:1::5/64"));
}

#[tokio::test]
async fn test_additional_device_dns_override() {
    let vm = vm_config(&[
        ("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0"),
        ("net1", "virtio=b4:87:18:bf:a3:60,bridge=vmbr1"),
        ("net2", "virtio=b4:87:18:bf:a3:61,bridge=vmbr2"),
    ]);
    let lookup = StaticAddressLookup::new()
        .with("net0-inet", "10.10.10.12/24", "10.10.10.1")
        .with("net1-inet", "196.168.100.124/24", "196.168.100.254")
        .with("net2-inet6", "2001:db8:2::5/64", "2001:db8:2::1");

    let network = NetworkSpec {
        default: None,
        additional_devices: vec![
            AdditionalNetworkDevice::new("net1", "vmbr1")
                .with_ipv4_pool(pool("pool-a"))
                .with_dns_servers(vec!["1.1.1.1".to_string()]),
            AdditionalNetworkDevice::new("net2", "vmbr2")
                .with_ipv6_pool(pool("pool-b6"))
                .with_dns_servers(vec!["2606:4700:4700::1111".to_string()]),
        ],
    };

    let configs = assemble(&vm, &lookup, &cluster(true, false), &network)
        .await
        .unwrap();

    assert_eq!(configs.len(), 3);
    assert_eq!(configs[0].dns_servers, dns());
    assert_eq!(configs[1].dns_servers, vec!["1.1.1.1"]);
    assert_eq!(configs[2].dns_servers, vec!["2606:4700:4700::1111"]);
}

#[tokio::test]
async fn test_additional_device_without_pool_is_dropped() {
    let vm = vm_config(&[
        ("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0"),
        ("net1", "virtio=b4:87:18:bf:a3:60,bridge=vmbr1"),
    ]);
    let lookup = StaticAddressLookup::new().with("net0-inet", "10.10.10.12/24", "10.10.10.1");

    let network = NetworkSpec {
        default: None,
        additional_devices: vec![AdditionalNetworkDevice::new("net1", "vmbr1")],
    };

    let configs = assemble(&vm, &lookup, &cluster(true, false), &network)
        .await
        .unwrap();

    assert_eq!(configs.len(), 1);
    assert_eq!(lookup.requested(), vec!["net0-inet"]);
}

/// Device source whose MAC for every device changes after the first read, as
/// happens when the hypervisor regenerates a NIC between two reads.
struct ChangingMacSource {
    reads: AtomicUsize,
}

impl NetworkDeviceSource for ChangingMacSource {
    fn merged_nets(&self) -> BTreeMap<String, String> {
        let mac = match self.reads.fetch_add(1, Ordering::SeqCst) {
            0 => "92:60:a0:5b:22:c2",
            _ => "92:60:a0:5b:22:ff",
        };
        BTreeMap::from([("net0".to_string(), format!("virtio={},bridge=vmbr0", mac))])
    }
}

#[tokio::test]
async fn test_dual_stack_mac_mismatch_fails_without_partial_result() {
    let source = ChangingMacSource {
        reads: AtomicUsize::new(0),
    };
    let lookup = StaticAddressLookup::new()
        .with("net0-inet", "10.10.10.12/24", "10.10.10.1")
        .with("net0-inet6", "2001:db8::12/64", "2001:db8::1");
    let cluster = cluster(true, true);
    let naming = DeviceNaming::default();
    let resolver = DeviceResolver::new(&source, &lookup, &cluster.dns_servers);

    let result = NetworkConfigAssembler::new(resolver, &cluster, &naming)
        .assemble(&NetworkSpec::default())
        .await;

    match result {
        Err(NetworkError::InconsistentDualStackMac {
            device,
            ipv4_mac,
            ipv6_mac,
        }) => {
            assert_eq!(device, "net0");
            assert_eq!(ipv4_mac, "92:60:a0:5b:22:c2");
            assert_eq!(ipv6_mac, "92:60:a0:5b:22:ff");
        }
        other => panic!("expected mac mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_default_device_lookup_failure_aborts_assembly() {
    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new().with("net0-inet", "10.10.10.12/24", "10.10.10.1");

    let err = assemble(&vm, &lookup, &cluster(true, true), &NetworkSpec::default())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.device(), "net0-inet6");
}

#[tokio::test]
async fn test_missing_mac_aborts_assembly() {
    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new()
        .with("net0-inet", "10.10.10.12/24", "10.10.10.1")
        .with("net3-inet", "10.20.0.3/24", "10.20.0.1");

    let network = NetworkSpec {
        default: None,
        additional_devices: vec![AdditionalNetworkDevice::new("net3", "vmbr3")
            .with_ipv4_pool(pool("pool-d"))],
    };

    let err = assemble(&vm, &lookup, &cluster(true, false), &network)
        .await
        .unwrap_err();

    assert!(matches!(err, NetworkError::MissingMacAddress { ref device } if device == "net3-inet"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_no_pools_configured_yields_no_devices() {
    let vm = vm_config(&[("net0", "virtio=92:60:a0:5b:22:c2,bridge=vmbr0")]);
    let lookup = StaticAddressLookup::new();

    let configs = assemble(&vm, &lookup, &cluster(false, false), &NetworkSpec::default())
        .await
        .unwrap();

    assert!(configs.is_empty());
    assert!(lookup.requested().is_empty());
}
