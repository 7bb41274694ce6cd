use pve_machine_types::{Bootstrap, ClusterNetworkSpec, ProxmoxMachine, VirtualMachine};

/// The records a bootstrap pass works on.
///
/// Only `machine` is written to; persisting its status is up to the caller.
#[derive(Debug, Clone)]
pub struct MachineScope {
    pub machine: ProxmoxMachine,
    pub cluster: ClusterNetworkSpec,
    pub bootstrap: Bootstrap,
    pub vm: VirtualMachine,
}

impl MachineScope {
    pub fn new(
        machine: ProxmoxMachine,
        cluster: ClusterNetworkSpec,
        bootstrap: Bootstrap,
        vm: VirtualMachine,
    ) -> Self {
        Self {
            machine,
            cluster,
            bootstrap,
            vm,
        }
    }

    pub fn name(&self) -> &str {
        &self.machine.name
    }
}
