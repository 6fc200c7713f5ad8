//! Static metric catalog
//!
//! Every metric the exporter can emit is declared here as a `static`
//! [`MetricDesc`]. Nothing in this module touches the network, so
//! [`MetricCatalog::describe`] works even when no vCenter is reachable.
//!
//! Per-component metrics (sensors, hardware status, network stacks, pNICs)
//! use fixed names. The varying identity of the component is always a label.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

/// Metric name prefix
pub const NAMESPACE: &str = "vsphere";

/// Prometheus metric type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    #[default]
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
    /// Histogram metric - observations counted in buckets
    Histogram,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Managed entity types collected from the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Host,
    VirtualMachine,
}

impl EntityType {
    /// All entity types, in collection order
    pub const ALL: [EntityType; 2] = [EntityType::Host, EntityType::VirtualMachine];

    /// Value of the `collector` label on `vsphere_collector_scrape_status`
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Host => "host",
            EntityType::VirtualMachine => "virtualmachine",
        }
    }

    /// vSphere managed object type name
    pub fn managed_object_type(&self) -> &'static str {
        match self {
            EntityType::Host => "HostSystem",
            EntityType::VirtualMachine => "VirtualMachine",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable metric descriptor
#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MetricDesc {
    /// Fully qualified metric name
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
    /// Label names, in the order label values are supplied
    pub labels: &'static [&'static str],
    /// Metric type
    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

impl MetricDesc {
    const fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            labels,
            metric_type: MetricType::Gauge,
        }
    }
}

const HOST_LABELS: &[&str] = &["hostname", "os"];
const HOST_SENSOR_LABELS: &[&str] = &["hostname", "os", "sensor_name", "sensor_id", "sensor_type"];
const HOST_COMPONENT_LABELS: &[&str] = &["hostname", "os", "component"];
const VM_LABELS: &[&str] = &["name", "guest", "host"];

/// Host metric descriptors
pub mod host {
    use super::{MetricDesc, HOST_COMPONENT_LABELS, HOST_LABELS, HOST_SENSOR_LABELS};

    pub static CONNECTION_STATE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_connection_state",
        "host connection state to vcenter, 1 for active, 2 for activeDefer, 3 for armed, 4 for init, 5 for down, 6 for unknown",
        HOST_LABELS,
    );
    pub static POWER_STATE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_power_state",
        "host power state, 1 for poweredOn, 2 for poweredOff, 3 for standBy, 4 for unknown",
        HOST_LABELS,
    );
    pub static STANDBY_MODE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_standby_mode",
        "host standby mode, 1 for in, 2 for exiting, 3 for entering, 4 for none",
        HOST_LABELS,
    );
    pub static MAINTENANCE_MODE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_maintenance_mode",
        "if the host is in maintenance mode, 1 for yes, 0 for no",
        HOST_LABELS,
    );
    pub static IN_QUARANTINE_MODE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_in_quarantine_mode",
        "if the host is in quarantine mode, 1 for yes, 0 for no",
        HOST_LABELS,
    );
    pub static VMOTION_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_vmotion_status",
        "the status of vmotion, 1 is enabled, 0 is disabled",
        HOST_LABELS,
    );
    pub static FAULT_TOLERANCE_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_fault_tolerance_status",
        "the status of fault tolerance logging, 1 is enabled, 0 is disabled",
        HOST_LABELS,
    );
    pub static FAULT_TOLERANCE_SUPPORTED: MetricDesc = MetricDesc::gauge(
        "vsphere_host_fault_tolerance_supported",
        "if the host supports fault tolerance, 1 for yes, 0 for no",
        HOST_LABELS,
    );
    pub static UPTIME: MetricDesc =
        MetricDesc::gauge("vsphere_host_uptime", "uptime of the host in seconds", HOST_LABELS);
    pub static OVERALL_CPU_USED: MetricDesc = MetricDesc::gauge(
        "vsphere_host_overall_cpu_used",
        "host overall cpu used in MHz",
        HOST_LABELS,
    );
    pub static OVERALL_MEMORY_USED: MetricDesc = MetricDesc::gauge(
        "vsphere_host_overall_memory_used",
        "host overall memory used in MB",
        HOST_LABELS,
    );
    pub static DISTRIBUTED_CPU_FAIRNESS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_distributed_cpu_fairness",
        "host distributed cpu fairness",
        HOST_LABELS,
    );
    pub static DISTRIBUTED_MEMORY_FAIRNESS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_distributed_memory_fairness",
        "host distributed memory fairness",
        HOST_LABELS,
    );
    pub static AVAILABLE_PMEM_CAPACITY: MetricDesc = MetricDesc::gauge(
        "vsphere_host_available_pmem_capacity",
        "host available persistent memory capacity in MB",
        HOST_LABELS,
    );
    pub static OVERALL_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_overall_status",
        "host overall status, 1 for green, 2 for yellow, 3 for gray, 4 for red",
        HOST_LABELS,
    );
    pub static MEMORY_SIZE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_memory_size",
        "host physical memory size in bytes",
        HOST_LABELS,
    );
    pub static CPU_SOCKETS: MetricDesc =
        MetricDesc::gauge("vsphere_host_cpu_sockets", "host cpu socket number", HOST_LABELS);
    pub static CPU_CORES: MetricDesc =
        MetricDesc::gauge("vsphere_host_cpu_cores", "host cpu cores", HOST_LABELS);
    pub static CPU_THREADS: MetricDesc =
        MetricDesc::gauge("vsphere_host_cpu_threads", "host cpu threads", HOST_LABELS);
    pub static NIC_COUNTS: MetricDesc =
        MetricDesc::gauge("vsphere_host_nic_counts", "host nic counts", HOST_LABELS);
    pub static HBA_COUNTS: MetricDesc =
        MetricDesc::gauge("vsphere_host_hba_counts", "host hba counts", HOST_LABELS);

    pub static SENSOR_READING: MetricDesc = MetricDesc::gauge(
        "vsphere_host_sensor_reading",
        "current reading of a host numeric sensor, scaled to its base units",
        HOST_SENSOR_LABELS,
    );
    pub static SENSOR_HEALTH: MetricDesc = MetricDesc::gauge(
        "vsphere_host_sensor_health",
        "host numeric sensor health, 0 for green, 1 for anything else",
        HOST_SENSOR_LABELS,
    );
    pub static MEMORY_HARDWARE_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_memory_hardware_status",
        "memory hardware status, 0 for green, 1 for anything else",
        HOST_COMPONENT_LABELS,
    );
    pub static CPU_HARDWARE_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_cpu_hardware_status",
        "cpu hardware status, 0 for green, 1 for anything else",
        HOST_COMPONENT_LABELS,
    );
    pub static STORAGE_HARDWARE_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_host_storage_hardware_status",
        "storage hardware status, 0 for green, 1 for anything else",
        HOST_COMPONENT_LABELS,
    );
    pub static NETWORK_STACK_STATE: MetricDesc = MetricDesc::gauge(
        "vsphere_host_network_stack_state",
        "network stack state, 1 for active, 0 for inactive",
        HOST_COMPONENT_LABELS,
    );
    pub static PNIC_AVAILABLE_BANDWIDTH: MetricDesc = MetricDesc::gauge(
        "vsphere_host_pnic_available_bandwidth_for_vm_traffic",
        "physical nic bandwidth available for virtual machine traffic in Mbit/s",
        HOST_COMPONENT_LABELS,
    );
    pub static PNIC_UNUSED_BANDWIDTH: MetricDesc = MetricDesc::gauge(
        "vsphere_host_pnic_unused_bandwidth_for_vm_traffic",
        "physical nic bandwidth unused by virtual machine traffic in Mbit/s",
        HOST_COMPONENT_LABELS,
    );

    /// All host descriptors
    pub static ALL: &[&MetricDesc] = &[
        &CONNECTION_STATE,
        &POWER_STATE,
        &STANDBY_MODE,
        &MAINTENANCE_MODE,
        &IN_QUARANTINE_MODE,
        &VMOTION_STATUS,
        &FAULT_TOLERANCE_STATUS,
        &FAULT_TOLERANCE_SUPPORTED,
        &UPTIME,
        &OVERALL_CPU_USED,
        &OVERALL_MEMORY_USED,
        &DISTRIBUTED_CPU_FAIRNESS,
        &DISTRIBUTED_MEMORY_FAIRNESS,
        &AVAILABLE_PMEM_CAPACITY,
        &OVERALL_STATUS,
        &MEMORY_SIZE,
        &CPU_SOCKETS,
        &CPU_CORES,
        &CPU_THREADS,
        &NIC_COUNTS,
        &HBA_COUNTS,
        &SENSOR_READING,
        &SENSOR_HEALTH,
        &MEMORY_HARDWARE_STATUS,
        &CPU_HARDWARE_STATUS,
        &STORAGE_HARDWARE_STATUS,
        &NETWORK_STACK_STATE,
        &PNIC_AVAILABLE_BANDWIDTH,
        &PNIC_UNUSED_BANDWIDTH,
    ];
}

/// Virtual machine metric descriptors
pub mod vm {
    use super::{MetricDesc, VM_LABELS};

    pub static UPTIME: MetricDesc = MetricDesc::gauge(
        "vsphere_vm_uptime",
        "the virtual machine uptime in seconds",
        VM_LABELS,
    );

    pub static ALL: &[&MetricDesc] = &[&UPTIME];
}

/// Per-pass meta descriptors
pub mod meta {
    use super::MetricDesc;

    pub static UP: MetricDesc = MetricDesc::gauge("vsphere_up", "vsphere up", &[]);
    pub static COLLECTOR_DURATION: MetricDesc = MetricDesc::gauge(
        "vsphere_exporter_collector_duration_seconds",
        "Collector time duration.",
        &[],
    );
    pub static COLLECTOR_SCRAPE_STATUS: MetricDesc = MetricDesc::gauge(
        "vsphere_collector_scrape_status",
        "collector scrape status, 1 for success, 0 for failure",
        &["collector"],
    );

    pub static ALL: &[&MetricDesc] = &[&UP, &COLLECTOR_DURATION, &COLLECTOR_SCRAPE_STATUS];
}

/// Read-only registry of every descriptor, grouped by entity type
#[derive(Debug)]
pub struct MetricCatalog {
    by_name: HashMap<&'static str, &'static MetricDesc>,
}

static CATALOG: Lazy<MetricCatalog> = Lazy::new(MetricCatalog::build);

impl MetricCatalog {
    /// Process-wide catalog, built on first use
    pub fn global() -> &'static MetricCatalog {
        &CATALOG
    }

    fn build() -> Self {
        let mut by_name = HashMap::new();
        for desc in host::ALL.iter().chain(vm::ALL).chain(meta::ALL) {
            let previous = by_name.insert(desc.name, *desc);
            debug_assert!(previous.is_none(), "duplicate metric name {}", desc.name);
        }
        Self { by_name }
    }

    /// Descriptors owned by an entity type collector
    pub fn for_entity(&self, entity: EntityType) -> &'static [&'static MetricDesc] {
        match entity {
            EntityType::Host => host::ALL,
            EntityType::VirtualMachine => vm::ALL,
        }
    }

    /// Full descriptor set: every entity catalog plus the meta descriptors
    pub fn describe(&self) -> Vec<&'static MetricDesc> {
        EntityType::ALL
            .iter()
            .flat_map(|entity| self.for_entity(*entity).iter().copied())
            .chain(meta::ALL.iter().copied())
            .collect()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_describe_is_idempotent() {
        let catalog = MetricCatalog::global();
        let first: HashSet<&str> = catalog.describe().iter().map(|d| d.name).collect();
        let second: HashSet<&str> = catalog.describe().iter().map(|d| d.name).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), catalog.len());
    }

    #[test]
    fn test_describe_includes_meta_descriptors() {
        let names: Vec<&str> = MetricCatalog::global()
            .describe()
            .iter()
            .map(|d| d.name)
            .collect();
        assert!(names.contains(&"vsphere_up"));
        assert!(names.contains(&"vsphere_exporter_collector_duration_seconds"));
        assert!(names.contains(&"vsphere_collector_scrape_status"));
        assert!(names.contains(&"vsphere_vm_uptime"));
        assert!(names.contains(&"vsphere_host_connection_state"));
    }

    #[test]
    fn test_names_are_namespaced_and_valid() {
        for desc in MetricCatalog::global().describe() {
            assert!(desc.name.starts_with(NAMESPACE), "{}", desc.name);
            assert!(desc
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            for label in desc.labels {
                assert!(label.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
            }
        }
    }

    #[test]
    fn test_entity_type_labels() {
        assert_eq!(EntityType::Host.to_string(), "host");
        assert_eq!(EntityType::VirtualMachine.to_string(), "virtualmachine");
        assert_eq!(EntityType::Host.managed_object_type(), "HostSystem");
    }
}
