//! Enum → numeric code tables
//!
//! Every table is total: any value the model cannot name lands on the
//! reserved highest code.

use crate::inventory::{ConnectionState, OverallStatus, PowerState, StandbyMode};

pub fn connection_state(state: ConnectionState) -> f64 {
    match state {
        ConnectionState::Active => 1.0,
        ConnectionState::ActiveDefer => 2.0,
        ConnectionState::Armed => 3.0,
        ConnectionState::Init => 4.0,
        ConnectionState::Down => 5.0,
        ConnectionState::Unknown => 6.0,
    }
}

pub fn power_state(state: PowerState) -> f64 {
    match state {
        PowerState::PoweredOn => 1.0,
        PowerState::PoweredOff => 2.0,
        PowerState::StandBy => 3.0,
        PowerState::Unknown => 4.0,
    }
}

pub fn standby_mode(mode: StandbyMode) -> f64 {
    match mode {
        StandbyMode::In => 1.0,
        StandbyMode::Exiting => 2.0,
        StandbyMode::Entering => 3.0,
        StandbyMode::None => 4.0,
    }
}

/// 4-way overall status. Not the same scale as [`component_health`].
pub fn overall_status(status: OverallStatus) -> f64 {
    match status {
        OverallStatus::Green => 1.0,
        OverallStatus::Yellow => 2.0,
        OverallStatus::Gray => 3.0,
        OverallStatus::Red => 4.0,
    }
}

/// Binary component health: green → 0, anything else → 1
pub fn component_health(key: &str) -> f64 {
    if key.eq_ignore_ascii_case("green") {
        0.0
    } else {
        1.0
    }
}

pub fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Absent optional flags report 0
pub fn optional_flag(value: Option<bool>) -> f64 {
    flag(value.unwrap_or(false))
}

pub fn net_stack_state(state: &str) -> f64 {
    if state == "active" {
        1.0
    } else {
        0.0
    }
}
