//! 인벤토리 엔티티 모델
//!
//! vSphere managed object 에서 필요한 속성만 평탄화한 구조체입니다.
//! Enum 상태 값은 알 수 없는 문자열도 받아들이도록 `Unknown` 계열로 흡수합니다.

use std::fmt;

/// Host connection state to vCenter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Active,
    ActiveDefer,
    Armed,
    Init,
    Down,
    #[default]
    Unknown,
}

impl From<&str> for ConnectionState {
    fn from(value: &str) -> Self {
        match value {
            "active" => ConnectionState::Active,
            "activeDefer" => ConnectionState::ActiveDefer,
            "armed" => ConnectionState::Armed,
            "init" => ConnectionState::Init,
            "down" => ConnectionState::Down,
            _ => ConnectionState::Unknown,
        }
    }
}

/// Host power state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    StandBy,
    #[default]
    Unknown,
}

impl From<&str> for PowerState {
    fn from(value: &str) -> Self {
        match value {
            "poweredOn" => PowerState::PoweredOn,
            "poweredOff" => PowerState::PoweredOff,
            "standBy" => PowerState::StandBy,
            _ => PowerState::Unknown,
        }
    }
}

/// Host standby mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandbyMode {
    In,
    Exiting,
    Entering,
    #[default]
    None,
}

impl From<&str> for StandbyMode {
    fn from(value: &str) -> Self {
        match value {
            "in" => StandbyMode::In,
            "exiting" => StandbyMode::Exiting,
            "entering" => StandbyMode::Entering,
            _ => StandbyMode::None,
        }
    }
}

/// Managed entity overall status
///
/// Anything that is not a known colour is treated as red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverallStatus {
    Green,
    Yellow,
    Gray,
    #[default]
    Red,
}

impl From<&str> for OverallStatus {
    fn from(value: &str) -> Self {
        match value {
            "green" => OverallStatus::Green,
            "yellow" => OverallStatus::Yellow,
            "gray" => OverallStatus::Gray,
            _ => OverallStatus::Red,
        }
    }
}

/// 숫자형 센서
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericSensor {
    pub id: String,
    pub name: String,
    pub sensor_type: String,
    /// Raw reading; scale with `10^unit_modifier`
    pub current_reading: i64,
    pub unit_modifier: i32,
    pub base_units: String,
    /// Health description key ("green", "yellow", "red", "unknown")
    pub health_key: String,
    pub timestamp: String,
}

impl NumericSensor {
    /// Reading in base units
    pub fn scaled_reading(&self) -> f64 {
        self.current_reading as f64 * 10f64.powi(self.unit_modifier)
    }
}

/// 하드웨어 구성요소 상태 (memory / cpu / storage)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardwareStatus {
    pub name: String,
    pub health_key: String,
}

/// 네트워크 스택 인스턴스
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetStackInstance {
    pub key: String,
    pub state: String,
}

/// Physical NIC bandwidth reserved for VM traffic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PnicBandwidth {
    pub device: String,
    pub available_bandwidth: i64,
    pub unused_bandwidth: i64,
}

/// ESXi host
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostEntity {
    /// Managed object id (e.g. "host-10")
    pub id: String,
    pub name: String,
    pub product_name: String,

    pub connection_state: ConnectionState,
    pub power_state: PowerState,
    pub standby_mode: StandbyMode,
    pub overall_status: OverallStatus,

    pub in_maintenance_mode: bool,
    pub in_quarantine_mode: Option<bool>,
    pub vmotion_enabled: bool,
    pub fault_tolerance_enabled: Option<bool>,
    pub fault_tolerance_supported: Option<bool>,

    /// Bytes
    pub memory_size: i64,
    pub cpu_sockets: i64,
    pub cpu_cores: i64,
    pub cpu_threads: i64,
    pub nic_count: i64,
    pub hba_count: i64,

    /// Seconds
    pub uptime: i64,
    /// MHz
    pub overall_cpu_usage: i64,
    /// MB
    pub overall_memory_usage: i64,
    pub distributed_cpu_fairness: i64,
    pub distributed_memory_fairness: i64,
    /// MB
    pub available_pmem_capacity: i64,

    pub sensors: Vec<NumericSensor>,
    pub memory_status: Vec<HardwareStatus>,
    pub cpu_status: Vec<HardwareStatus>,
    pub storage_status: Vec<HardwareStatus>,
    pub net_stacks: Vec<NetStackInstance>,
    pub pnic_bandwidth: Vec<PnicBandwidth>,
}

/// Virtual machine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmEntity {
    /// Managed object id (e.g. "vm-42")
    pub id: String,
    pub name: String,
    pub guest_full_name: String,
    pub uptime_seconds: i64,
    /// Managed object id of the host running this VM, if any
    pub host_id: Option<String>,
}

impl fmt::Display for HostEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl fmt::Display for VmEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
