//! HostSystem 메트릭 수집

use crate::catalog::{host as desc, MetricDesc};
use crate::inventory::{HardwareStatus, HostEntity};

use super::encoding;
use super::sample::MetricSample;

/// 호스트 하나에서 카탈로그에 정의된 샘플을 모두 생성
pub fn collect(host: &HostEntity) -> Vec<MetricSample> {
    let base = [host.name.as_str(), host.product_name.as_str()];
    let gauge = |d: &'static MetricDesc, value: f64| MetricSample::new(d, base, value);

    let mut samples = vec![
        gauge(
            &desc::CONNECTION_STATE,
            encoding::connection_state(host.connection_state),
        ),
        gauge(&desc::POWER_STATE, encoding::power_state(host.power_state)),
        gauge(&desc::STANDBY_MODE, encoding::standby_mode(host.standby_mode)),
        gauge(
            &desc::MAINTENANCE_MODE,
            encoding::flag(host.in_maintenance_mode),
        ),
        gauge(
            &desc::IN_QUARANTINE_MODE,
            encoding::optional_flag(host.in_quarantine_mode),
        ),
        gauge(&desc::VMOTION_STATUS, encoding::flag(host.vmotion_enabled)),
        gauge(
            &desc::FAULT_TOLERANCE_STATUS,
            encoding::optional_flag(host.fault_tolerance_enabled),
        ),
        gauge(
            &desc::FAULT_TOLERANCE_SUPPORTED,
            encoding::optional_flag(host.fault_tolerance_supported),
        ),
        gauge(&desc::UPTIME, host.uptime as f64),
        gauge(&desc::OVERALL_CPU_USED, host.overall_cpu_usage as f64),
        gauge(&desc::OVERALL_MEMORY_USED, host.overall_memory_usage as f64),
        gauge(
            &desc::DISTRIBUTED_CPU_FAIRNESS,
            host.distributed_cpu_fairness as f64,
        ),
        gauge(
            &desc::DISTRIBUTED_MEMORY_FAIRNESS,
            host.distributed_memory_fairness as f64,
        ),
        gauge(
            &desc::AVAILABLE_PMEM_CAPACITY,
            host.available_pmem_capacity as f64,
        ),
        gauge(
            &desc::OVERALL_STATUS,
            encoding::overall_status(host.overall_status),
        ),
        gauge(&desc::MEMORY_SIZE, host.memory_size as f64),
        gauge(&desc::CPU_SOCKETS, host.cpu_sockets as f64),
        gauge(&desc::CPU_CORES, host.cpu_cores as f64),
        gauge(&desc::CPU_THREADS, host.cpu_threads as f64),
        gauge(&desc::NIC_COUNTS, host.nic_count as f64),
        gauge(&desc::HBA_COUNTS, host.hba_count as f64),
    ];

    for sensor in &host.sensors {
        let labels = [
            base[0],
            base[1],
            sensor.name.as_str(),
            sensor.id.as_str(),
            sensor.sensor_type.as_str(),
        ];
        samples.push(MetricSample::new(
            &desc::SENSOR_READING,
            labels,
            sensor.scaled_reading(),
        ));
        samples.push(MetricSample::new(
            &desc::SENSOR_HEALTH,
            labels,
            encoding::component_health(&sensor.health_key),
        ));
    }

    push_hardware_status(&mut samples, &desc::MEMORY_HARDWARE_STATUS, base, &host.memory_status);
    push_hardware_status(&mut samples, &desc::CPU_HARDWARE_STATUS, base, &host.cpu_status);
    push_hardware_status(
        &mut samples,
        &desc::STORAGE_HARDWARE_STATUS,
        base,
        &host.storage_status,
    );

    for stack in &host.net_stacks {
        samples.push(MetricSample::new(
            &desc::NETWORK_STACK_STATE,
            [base[0], base[1], stack.key.as_str()],
            encoding::net_stack_state(&stack.state),
        ));
    }

    for pnic in &host.pnic_bandwidth {
        let labels = [base[0], base[1], pnic.device.as_str()];
        samples.push(MetricSample::new(
            &desc::PNIC_AVAILABLE_BANDWIDTH,
            labels,
            pnic.available_bandwidth as f64,
        ));
        samples.push(MetricSample::new(
            &desc::PNIC_UNUSED_BANDWIDTH,
            labels,
            pnic.unused_bandwidth as f64,
        ));
    }

    samples
}

fn push_hardware_status(
    samples: &mut Vec<MetricSample>,
    desc: &'static MetricDesc,
    base: [&str; 2],
    entries: &[HardwareStatus],
) {
    samples.extend(entries.iter().map(|entry| {
        MetricSample::new(
            desc,
            [base[0], base[1], entry.name.as_str()],
            encoding::component_health(&entry.health_key),
        )
    }));
}
