//! VirtualMachine 메트릭 수집

use std::collections::HashMap;

use crate::catalog::vm as desc;
use crate::inventory::VmEntity;

use super::sample::MetricSample;

/// VM 하나의 uptime 샘플 생성
///
/// `host_names` 는 이번 패스에서 호스트 브랜치가 만든 id → 이름 매핑입니다.
/// 매핑에 없는 호스트는 빈 문자열로 레이블링합니다.
pub fn collect(vm: &VmEntity, host_names: &HashMap<String, String>) -> Vec<MetricSample> {
    let host = vm
        .host_id
        .as_ref()
        .and_then(|id| host_names.get(id))
        .map(String::as_str)
        .unwrap_or("");

    vec![MetricSample::new(
        &desc::UPTIME,
        [vm.name.as_str(), vm.guest_full_name.as_str(), host],
        vm.uptime_seconds as f64,
    )]
}
