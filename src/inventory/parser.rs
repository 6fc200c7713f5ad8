//! VI/JSON 응답 파서
//!
//! `RetrievePropertiesEx` 응답을 파싱하여 [`HostEntity`] / [`VmEntity`] 로 변환합니다.
//!
//! VI/JSON 은 `Any` 타입 속성 값을 `{"_typeName": "string", "_value": "..."}` 형태로
//! 감싸서 보내므로, 속성 값은 먼저 unwrap 한 뒤 타입별 구조체로 역직렬화합니다.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::model::{
    ConnectionState, HardwareStatus, HostEntity, NetStackInstance, NumericSensor, OverallStatus,
    PnicBandwidth, PowerState, StandbyMode, VmEntity,
};
use crate::error::RequestError;

/// 파서 결과 타입
pub type ParseResult<T> = Result<T, RequestError>;

/// Managed object reference
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    /// VI/JSON 요청 본문에 들어가는 형태
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "_typeName": "ManagedObjectReference",
            "type": self.kind,
            "value": self.value,
        })
    }
}

/// `ServiceInstance.content` 중 사용하는 참조들
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub view_manager: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
}

/// 한 번의 RetrievePropertiesEx / ContinueRetrievePropertiesEx 결과
#[derive(Debug, Clone, Default)]
pub struct RetrievePage {
    pub objects: Vec<ObjectContent>,
    /// 다음 페이지 토큰
    pub token: Option<String>,
}

/// 객체 하나와 그 속성들 (unwrap 된 값)
#[derive(Debug, Clone)]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    pub properties: HashMap<String, Value>,
}

impl ObjectContent {
    /// 속성을 타입 구조체로 역직렬화 (없으면 None)
    fn property<T: DeserializeOwned>(&self, path: &str) -> ParseResult<Option<T>> {
        match self.properties.get(path) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    RequestError::Decode(format!(
                        "property '{}' of {}: {}",
                        path, self.obj.value, e
                    ))
                }),
        }
    }
}

#[derive(Deserialize)]
struct RawRetrieveResult {
    #[serde(default)]
    objects: Vec<RawObjectContent>,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObjectContent {
    obj: ManagedObjectReference,
    #[serde(default)]
    prop_set: Vec<RawDynamicProperty>,
}

#[derive(Deserialize)]
struct RawDynamicProperty {
    name: String,
    #[serde(default)]
    val: Value,
}

/// `{"_typeName": "...", "_value": x}` 래퍼를 벗겨냄
fn unwrap_any(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("_value") => {
            map.remove("_value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// RetrieveResult 파싱
///
/// 결과가 없으면 vSphere 는 빈 본문이나 `null` 을 돌려주므로 빈 페이지로 처리합니다.
pub fn parse_retrieve_result(body: &str) -> ParseResult<RetrievePage> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RetrievePage::default());
    }

    let raw: RawRetrieveResult =
        serde_json::from_str(trimmed).map_err(|e| RequestError::Decode(e.to_string()))?;

    let objects = raw
        .objects
        .into_iter()
        .map(|object| ObjectContent {
            obj: object.obj,
            properties: object
                .prop_set
                .into_iter()
                .map(|prop| (prop.name, unwrap_any(prop.val)))
                .collect(),
        })
        .collect();

    Ok(RetrievePage {
        objects,
        token: raw.token.filter(|t| !t.is_empty()),
    })
}

/// ServiceContent 파싱
pub fn parse_service_content(body: &str) -> ParseResult<ServiceContent> {
    serde_json::from_str(body).map_err(|e| RequestError::Decode(e.to_string()))
}

/// ManagedObjectReference 파싱 (CreateContainerView 응답)
pub fn parse_moref(body: &str) -> ParseResult<ManagedObjectReference> {
    serde_json::from_str(body).map_err(|e| RequestError::Decode(e.to_string()))
}

/// Fault 본문에서 (타입 이름, 메시지) 추출
pub fn parse_fault(body: &str) -> (String, String) {
    #[derive(Deserialize)]
    struct RawFault {
        #[serde(rename = "_typeName")]
        type_name: Option<String>,
        faultstring: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<RawFault>(body) {
        Ok(fault) => (
            fault.type_name.unwrap_or_else(|| "UnknownFault".to_string()),
            fault
                .faultstring
                .or(fault.message)
                .unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => ("UnknownFault".to_string(), body.to_string()),
    }
}

// ---------------------------------------------------------------------------
// HostSystem
// ---------------------------------------------------------------------------

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawHostConfigSummary {
    name: String,
    product: Option<RawProduct>,
    vmotion_enabled: bool,
    fault_tolerance_enabled: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawProduct {
    full_name: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawHardwareSummary {
    memory_size: i64,
    num_cpu_pkgs: i64,
    num_cpu_cores: i64,
    num_cpu_threads: i64,
    num_nics: i64,
    #[serde(rename = "numHBAs")]
    num_hbas: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawQuickStats {
    overall_cpu_usage: i64,
    overall_memory_usage: i64,
    distributed_cpu_fairness: i64,
    distributed_memory_fairness: i64,
    #[serde(rename = "availablePMemCapacity")]
    available_pmem_capacity: i64,
    uptime: i64,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawHostRuntime {
    connection_state: String,
    power_state: String,
    standby_mode: Option<String>,
    in_maintenance_mode: bool,
    in_quarantine_mode: Option<bool>,
    health_system_runtime: Option<RawHealthSystemRuntime>,
    network_runtime_info: Option<RawNetworkRuntimeInfo>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawHealthSystemRuntime {
    system_health_info: Option<RawSystemHealthInfo>,
    hardware_status_info: Option<RawHardwareStatusInfo>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawSystemHealthInfo {
    numeric_sensor_info: Vec<RawNumericSensorInfo>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawNumericSensorInfo {
    name: String,
    health_state: Option<RawElementDescription>,
    current_reading: i64,
    unit_modifier: i32,
    base_units: String,
    sensor_type: Option<String>,
    id: Option<String>,
    time_stamp: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawElementDescription {
    key: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawHardwareStatusInfo {
    memory_status_info: Vec<RawHardwareElementInfo>,
    cpu_status_info: Vec<RawHardwareElementInfo>,
    storage_status_info: Vec<RawHardwareElementInfo>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawHardwareElementInfo {
    name: String,
    status: Option<RawElementDescription>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawNetworkRuntimeInfo {
    net_stack_instance_runtime_info: Vec<RawNetStackInstance>,
    network_resource_runtime: Option<RawNetworkResourceRuntime>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawNetStackInstance {
    net_stack_instance_key: String,
    state: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawNetworkResourceRuntime {
    pnic_resource_info: Vec<RawPnicResourceInfo>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawPnicResourceInfo {
    #[serde(rename = "pnicDevice")]
    pnic_device: String,
    #[serde(rename = "availableBandwidthForVMTraffic")]
    available_bandwidth: i64,
    #[serde(rename = "unusedBandwidthForVMTraffic")]
    unused_bandwidth: i64,
}

fn hardware_status(items: Vec<RawHardwareElementInfo>) -> Vec<HardwareStatus> {
    items
        .into_iter()
        .map(|item| HardwareStatus {
            name: item.name,
            health_key: item.status.map(|s| s.key).unwrap_or_default(),
        })
        .collect()
}

/// HostSystem ObjectContent → HostEntity
pub fn host_from_object(object: &ObjectContent) -> ParseResult<HostEntity> {
    let config: RawHostConfigSummary = object.property("summary.config")?.unwrap_or_default();
    let hardware: RawHardwareSummary = object.property("summary.hardware")?.unwrap_or_default();
    let stats: RawQuickStats = object.property("summary.quickStats")?.unwrap_or_default();
    let overall_status: String = object
        .property("summary.overallStatus")?
        .unwrap_or_default();
    let runtime: RawHostRuntime = object.property("runtime")?.unwrap_or_default();
    let ft_supported: Option<bool> = object.property("capability.ftSupported")?;
    let managed_name: Option<String> = object.property("name")?;

    let name = if config.name.is_empty() {
        managed_name.unwrap_or_default()
    } else {
        config.name
    };

    let health = runtime.health_system_runtime.unwrap_or_default();
    let sensors = health
        .system_health_info
        .unwrap_or_default()
        .numeric_sensor_info
        .into_iter()
        .map(|sensor| NumericSensor {
            id: sensor.id.unwrap_or_default(),
            name: sensor.name,
            sensor_type: sensor.sensor_type.unwrap_or_default(),
            current_reading: sensor.current_reading,
            unit_modifier: sensor.unit_modifier,
            base_units: sensor.base_units,
            health_key: sensor.health_state.map(|h| h.key).unwrap_or_default(),
            timestamp: sensor.time_stamp.unwrap_or_default(),
        })
        .collect();

    let status_info = health.hardware_status_info.unwrap_or_default();
    let network = runtime.network_runtime_info.unwrap_or_default();

    Ok(HostEntity {
        id: object.obj.value.clone(),
        name,
        product_name: config.product.map(|p| p.full_name).unwrap_or_default(),

        connection_state: ConnectionState::from(runtime.connection_state.as_str()),
        power_state: PowerState::from(runtime.power_state.as_str()),
        standby_mode: StandbyMode::from(runtime.standby_mode.as_deref().unwrap_or_default()),
        overall_status: OverallStatus::from(overall_status.as_str()),

        in_maintenance_mode: runtime.in_maintenance_mode,
        in_quarantine_mode: runtime.in_quarantine_mode,
        vmotion_enabled: config.vmotion_enabled,
        fault_tolerance_enabled: config.fault_tolerance_enabled,
        fault_tolerance_supported: ft_supported,

        memory_size: hardware.memory_size,
        cpu_sockets: hardware.num_cpu_pkgs,
        cpu_cores: hardware.num_cpu_cores,
        cpu_threads: hardware.num_cpu_threads,
        nic_count: hardware.num_nics,
        hba_count: hardware.num_hbas,

        uptime: stats.uptime,
        overall_cpu_usage: stats.overall_cpu_usage,
        overall_memory_usage: stats.overall_memory_usage,
        distributed_cpu_fairness: stats.distributed_cpu_fairness,
        distributed_memory_fairness: stats.distributed_memory_fairness,
        available_pmem_capacity: stats.available_pmem_capacity,

        sensors,
        memory_status: hardware_status(status_info.memory_status_info),
        cpu_status: hardware_status(status_info.cpu_status_info),
        storage_status: hardware_status(status_info.storage_status_info),
        net_stacks: network
            .net_stack_instance_runtime_info
            .into_iter()
            .map(|stack| NetStackInstance {
                key: stack.net_stack_instance_key,
                state: stack.state.unwrap_or_default(),
            })
            .collect(),
        pnic_bandwidth: network
            .network_resource_runtime
            .unwrap_or_default()
            .pnic_resource_info
            .into_iter()
            .map(|pnic| PnicBandwidth {
                device: pnic.pnic_device,
                available_bandwidth: pnic.available_bandwidth,
                unused_bandwidth: pnic.unused_bandwidth,
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// VirtualMachine
// ---------------------------------------------------------------------------

/// VirtualMachine ObjectContent → VmEntity
pub fn vm_from_object(object: &ObjectContent) -> ParseResult<VmEntity> {
    let config_name: Option<String> = object.property("config.name")?;
    let managed_name: Option<String> = object.property("name")?;
    let config_guest: Option<String> = object.property("config.guestFullName")?;
    let guest_guest: Option<String> = object.property("guest.guestFullName")?;
    let uptime: Option<i64> = object.property("summary.quickStats.uptimeSeconds")?;
    let host: Option<ManagedObjectReference> = object.property("runtime.host")?;

    let non_empty = |s: &String| !s.is_empty();

    Ok(VmEntity {
        id: object.obj.value.clone(),
        name: config_name
            .filter(non_empty)
            .or(managed_name)
            .unwrap_or_default(),
        guest_full_name: config_guest
            .filter(non_empty)
            .or(guest_guest)
            .unwrap_or_default(),
        uptime_seconds: uptime.unwrap_or_default(),
        host_id: host.map(|h| h.value),
    })
}
