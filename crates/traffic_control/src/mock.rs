//! Mock 交通控制服务器
//!
//! 用于单元测试和离线运行的 mock 实现，支持注入失败场景。
//! 车辆按期望速度沿初始朝向匀速行驶，仅作为测试替身，不是轨迹模型。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    heading_velocity, Coord, ScenarioBlueprint, SimTime, Speed, TelemetryEvent, TelemetryReport,
    TelemetrySource, VehicleConfig,
};
use tracing::{debug, instrument, trace};

use crate::client::{CommandInterface, ManagerLocator, ScenarioManager, VehicleCommands};
use crate::error::{Result, TrafficControlError};

/// Mock 配置
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// 未连接：command_interface() 返回 None
    pub disconnected: bool,
    /// 创建 vehicle handle 时应该失败的 vehicle IDs
    pub fail_vehicles: Vec<String>,
}

/// 已执行的控制命令 (用于断言)
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    SetSpeed {
        external_id: String,
        speed: Speed,
        at: SimTime,
    },
    ChangeRoute {
        external_id: String,
        road_id: String,
        extent_m: f64,
        at: SimTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Pending,
    Active,
    Departed,
}

#[derive(Debug, Clone)]
struct MockVehicle {
    id: String,
    road_id: String,
    position: Coord,
    angle: f64,
    desired_speed: f64,
    /// set_speed 覆盖值，None = 使用期望速度
    speed_override: Option<f64>,
    speed: f64,
    accel: f64,
    depart: SimTime,
    arrive: Option<SimTime>,
    presence: Presence,
}

impl MockVehicle {
    fn target_speed(&self) -> f64 {
        self.speed_override.unwrap_or(self.desired_speed)
    }

    fn advance(&mut self, dt: f64) {
        let target = self.target_speed();
        self.accel = if dt > 0.0 {
            (target - self.speed) / dt
        } else {
            0.0
        };
        self.speed = target;
        self.position += heading_velocity(Speed::Known(self.speed), self.angle) * dt;
    }

    fn report(&self) -> TelemetryReport {
        TelemetryReport {
            external_id: self.id.clone(),
            position: self.position,
            road_id: self.road_id.clone(),
            speed: Speed::Known(self.speed),
            angle: self.angle,
        }
    }
}

#[derive(Debug, Default)]
struct MockWorld {
    vehicles: Vec<MockVehicle>,
    commands: Vec<MockCommand>,
    last_poll: Option<SimTime>,
}

impl MockWorld {
    fn now(&self) -> SimTime {
        self.last_poll.unwrap_or(SimTime::ZERO)
    }

    fn active_mut(&mut self, external_id: &str) -> Result<&mut MockVehicle> {
        match self.vehicles.iter_mut().find(|v| v.id == external_id) {
            Some(v) if v.presence == Presence::Departed => Err(
                TrafficControlError::vehicle_unavailable(external_id, "vehicle has left the simulation"),
            ),
            Some(v) => Ok(v),
            None => Err(TrafficControlError::vehicle_unavailable(
                external_id,
                "unknown vehicle",
            )),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    config: MockConfig,
    world: Mutex<MockWorld>,
}

impl Shared {
    fn world(&self) -> MutexGuard<'_, MockWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock 交通控制服务器
///
/// 同时充当 `ScenarioManager`、`CommandInterface` 和遥测源。
pub struct MockTrafficManager {
    shared: Arc<Shared>,
    interface: Arc<MockCommandInterface>,
}

impl MockTrafficManager {
    /// 创建默认 mock 服务器
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 服务器
    pub fn with_config(config: MockConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            world: Mutex::new(MockWorld::default()),
        });
        Self {
            interface: Arc::new(MockCommandInterface {
                shared: shared.clone(),
            }),
            shared,
        }
    }

    /// 根据场景蓝图创建并注册所有车辆
    pub fn from_blueprint(blueprint: &ScenarioBlueprint) -> Self {
        let manager = Self::new();
        for vehicle in &blueprint.vehicles {
            manager.add_vehicle_config(vehicle);
        }
        manager
    }

    /// 注册一辆在 t=0 进入、一直运行的车辆
    pub fn add_vehicle(
        &self,
        id: &str,
        road_id: &str,
        position: Coord,
        angle: f64,
        desired_speed: f64,
    ) {
        self.insert(MockVehicle {
            id: id.to_string(),
            road_id: road_id.to_string(),
            position,
            angle,
            desired_speed,
            speed_override: None,
            speed: desired_speed,
            accel: 0.0,
            depart: SimTime::ZERO,
            arrive: None,
            presence: Presence::Pending,
        });
    }

    /// 按车辆配置注册车辆
    pub fn add_vehicle_config(&self, config: &VehicleConfig) {
        self.insert(MockVehicle {
            id: config.id.clone(),
            road_id: config.road_id.clone(),
            position: config.spawn.into(),
            angle: config.angle,
            desired_speed: config.desired_speed,
            speed_override: None,
            speed: config.desired_speed,
            accel: 0.0,
            depart: SimTime::from_secs(config.depart_s),
            arrive: config.arrive_s.map(SimTime::from_secs),
            presence: Presence::Pending,
        });
    }

    fn insert(&self, vehicle: MockVehicle) {
        debug!(vehicle_id = %vehicle.id, depart = %vehicle.depart, "mock vehicle registered");
        self.shared.world().vehicles.push(vehicle);
    }

    /// 遥测源 (与本服务器共享状态)
    pub fn telemetry(&self) -> MockTelemetry {
        MockTelemetry {
            shared: self.shared.clone(),
        }
    }

    /// 返回始终定位到本服务器的 locator
    pub fn locator(self: &Arc<Self>) -> Arc<dyn ManagerLocator> {
        let manager = self.clone();
        Arc::new(move || Some(manager.clone() as Arc<dyn ScenarioManager>))
    }

    /// 已执行的所有控制命令
    pub fn commands(&self) -> Vec<MockCommand> {
        self.shared.world().commands.clone()
    }

    /// 车辆当前速度 (已离开或不存在则为 None)
    pub fn vehicle_speed(&self, external_id: &str) -> Option<f64> {
        self.shared
            .world()
            .active_mut(external_id)
            .ok()
            .map(|v| v.speed)
    }
}

impl Default for MockTrafficManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioManager for MockTrafficManager {
    fn command_interface(&self) -> Option<Arc<dyn CommandInterface>> {
        if self.shared.config.disconnected {
            None
        } else {
            Some(self.interface.clone() as Arc<dyn CommandInterface>)
        }
    }
}

struct MockCommandInterface {
    shared: Arc<Shared>,
}

impl CommandInterface for MockCommandInterface {
    #[instrument(name = "mock_traffic_vehicle", skip(self))]
    fn vehicle(&self, external_id: &str) -> Result<Box<dyn VehicleCommands>> {
        if self.shared.config.fail_vehicles.iter().any(|id| id == external_id) {
            return Err(TrafficControlError::vehicle_unavailable(
                external_id,
                "mock failure",
            ));
        }

        self.shared.world().active_mut(external_id)?;

        Ok(Box::new(MockVehicleHandle {
            external_id: external_id.to_string(),
            shared: self.shared.clone(),
        }))
    }
}

struct MockVehicleHandle {
    external_id: String,
    shared: Arc<Shared>,
}

impl VehicleCommands for MockVehicleHandle {
    fn external_id(&self) -> &str {
        &self.external_id
    }

    #[instrument(name = "mock_traffic_set_speed", skip(self), fields(vehicle_id = %self.external_id))]
    fn set_speed(&self, speed: Speed) -> Result<()> {
        let mut world = self.shared.world();
        let at = world.now();
        world.active_mut(&self.external_id)?.speed_override = speed.known();
        world.commands.push(MockCommand::SetSpeed {
            external_id: self.external_id.clone(),
            speed,
            at,
        });
        Ok(())
    }

    #[instrument(name = "mock_traffic_change_route", skip(self), fields(vehicle_id = %self.external_id))]
    fn change_route(&self, road_id: &str, extent_m: f64) -> Result<()> {
        let mut world = self.shared.world();
        let at = world.now();
        world.active_mut(&self.external_id)?;
        world.commands.push(MockCommand::ChangeRoute {
            external_id: self.external_id.clone(),
            road_id: road_id.to_string(),
            extent_m,
            at,
        });
        Ok(())
    }

    fn road_id(&self) -> Result<String> {
        Ok(self.shared.world().active_mut(&self.external_id)?.road_id.clone())
    }

    fn speed(&self) -> Result<Speed> {
        Ok(Speed::Known(
            self.shared.world().active_mut(&self.external_id)?.speed,
        ))
    }

    fn accel(&self) -> Result<f64> {
        Ok(self.shared.world().active_mut(&self.external_id)?.accel)
    }
}

/// Mock 遥测源
///
/// 每次 poll 推进所有活动车辆并为每辆车产生一条报告。
pub struct MockTelemetry {
    shared: Arc<Shared>,
}

impl TelemetrySource for MockTelemetry {
    #[instrument(name = "mock_traffic_poll", level = "trace", skip(self), fields(now = %now))]
    fn poll(&mut self, now: SimTime) -> Vec<TelemetryEvent> {
        let mut world = self.shared.world();
        let dt = world
            .last_poll
            .map(|last| (now - last).as_secs().max(0.0))
            .unwrap_or(0.0);
        world.last_poll = Some(now);

        let mut events = Vec::new();
        for vehicle in world.vehicles.iter_mut() {
            match vehicle.presence {
                Presence::Pending if now >= vehicle.depart => {
                    vehicle.presence = Presence::Active;
                    events.push(TelemetryEvent::Report(vehicle.report()));
                }
                Presence::Active if vehicle.arrive.is_some_and(|arrive| now >= arrive) => {
                    vehicle.presence = Presence::Departed;
                    events.push(TelemetryEvent::Departed {
                        external_id: vehicle.id.clone(),
                    });
                }
                Presence::Active => {
                    vehicle.advance(dt);
                    events.push(TelemetryEvent::Report(vehicle.report()));
                }
                _ => {}
            }
        }

        trace!(events = events.len(), "mock telemetry polled");
        events
    }
}
