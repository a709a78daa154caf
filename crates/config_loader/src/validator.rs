//! 配置校验模块
//!
//! 校验规则：
//! - vehicle_id 非空且唯一
//! - world.step_s / world.duration_s > 0
//! - desired_speed >= 0, depart_s >= 0, arrive_s > depart_s
//! - 停车动作: at_s >= 0, resume_after_s > 0
//! - sink 名称非空且唯一

use std::collections::HashSet;

use contracts::{ContractError, ScenarioBlueprint, VehicleConfig};

/// 校验 ScenarioBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    validate_world(blueprint)?;
    validate_vehicle_ids(blueprint)?;
    for vehicle in &blueprint.vehicles {
        validate_vehicle_timing(vehicle)?;
        validate_stops(vehicle)?;
    }
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验世界参数
fn validate_world(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    let world = &blueprint.world;

    if !world.step_s.is_finite() || world.step_s <= 0.0 {
        return Err(ContractError::config_validation(
            "world.step_s",
            format!("step_s must be > 0, got {}", world.step_s),
        ));
    }
    if !world.duration_s.is_finite() || world.duration_s <= 0.0 {
        return Err(ContractError::config_validation(
            "world.duration_s",
            format!("duration_s must be > 0, got {}", world.duration_s),
        ));
    }
    Ok(())
}

/// 校验 vehicle_id 非空且唯一
fn validate_vehicle_ids(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, vehicle) in blueprint.vehicles.iter().enumerate() {
        if vehicle.id.is_empty() {
            return Err(ContractError::config_validation(
                format!("vehicles[{idx}].id"),
                "vehicle id cannot be empty",
            ));
        }
        if !seen.insert(&vehicle.id) {
            return Err(ContractError::config_validation(
                format!("vehicles[id={}]", vehicle.id),
                "duplicate vehicle_id",
            ));
        }
    }
    Ok(())
}

/// 校验速度与进出时间
fn validate_vehicle_timing(vehicle: &VehicleConfig) -> Result<(), ContractError> {
    if !vehicle.desired_speed.is_finite() || vehicle.desired_speed < 0.0 {
        return Err(ContractError::config_validation(
            format!("vehicles[{}].desired_speed", vehicle.id),
            format!("desired_speed must be >= 0, got {}", vehicle.desired_speed),
        ));
    }
    if !vehicle.depart_s.is_finite() || vehicle.depart_s < 0.0 {
        return Err(ContractError::config_validation(
            format!("vehicles[{}].depart_s", vehicle.id),
            format!("depart_s must be >= 0, got {}", vehicle.depart_s),
        ));
    }
    if let Some(arrive) = vehicle.arrive_s {
        if arrive.is_nan() || arrive <= vehicle.depart_s {
            return Err(ContractError::config_validation(
                format!("vehicles[{}].arrive_s", vehicle.id),
                format!(
                    "arrive_s ({arrive}) must be > depart_s ({})",
                    vehicle.depart_s
                ),
            ));
        }
    }
    Ok(())
}

/// 校验定时停车动作
fn validate_stops(vehicle: &VehicleConfig) -> Result<(), ContractError> {
    for (idx, stop) in vehicle.stops.iter().enumerate() {
        if !stop.at_s.is_finite() || stop.at_s < 0.0 {
            return Err(ContractError::config_validation(
                format!("vehicles[{}].stops[{idx}].at_s", vehicle.id),
                format!("at_s must be >= 0, got {}", stop.at_s),
            ));
        }
        if !stop.resume_after_s.is_finite() || stop.resume_after_s <= 0.0 {
            return Err(ContractError::config_validation(
                format!("vehicles[{}].stops[{idx}].resume_after_s", vehicle.id),
                format!("resume_after_s must be > 0, got {}", stop.resume_after_s),
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &ScenarioBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
    }
    Ok(())
}
