//! 定时停车告警应用
//!
//! 每辆车按配置的停车动作在指定时间停车、读取道路状态并广播告警；
//! 收到告警的车辆改道并转发一次确认。告警在进程内投递，不做报文编码。

use contracts::{SimTime, Speed, StopConfig};
use tracing::{info, instrument, warn};
use traffic_control::ExternalHandleCache;

/// 确认告警的名称
pub const ACKNOWLEDGE_LABEL: &str = "Got it!";

/// 收到告警后改道的作用距离 (米)
pub const REROUTE_EXTENT_M: f64 = 999.9;

/// 收到告警时主机图标颜色
pub const RECEIVER_COLOR: &str = "green";

/// 道路告警
#[derive(Debug, Clone, PartialEq)]
pub struct HazardNotice {
    /// 发送者 external id
    pub sender: String,
    /// 告警名称 ("obstacle!" / "Got it!")
    pub label: String,
    /// 发生告警的道路
    pub road_id: String,
    /// 发送时的车速
    pub road_speed: f64,
    /// 发送时的加速度
    pub acceleration: f64,
    /// 路面湿度
    pub road_humidity: String,
    /// 发送时间
    pub sent_at: SimTime,
}

/// 单车告警应用状态
#[derive(Debug, Clone, Default)]
pub struct HazardApp {
    stops: Vec<StopConfig>,
    color: Option<String>,
    forwarded: bool,
    received: Vec<HazardNotice>,
}

impl HazardApp {
    pub fn new(stops: Vec<StopConfig>) -> Self {
        Self {
            stops,
            ..Self::default()
        }
    }

    /// 配置的停车动作
    pub fn stops(&self) -> &[StopConfig] {
        &self.stops
    }

    /// 当前主机图标颜色 (未标记则为 None)
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// 已收到的告警
    pub fn received(&self) -> &[HazardNotice] {
        &self.received
    }

    /// 是否已转发过确认
    pub fn has_forwarded(&self) -> bool {
        self.forwarded
    }

    /// 执行第 `index` 个停车动作，返回要广播的告警
    ///
    /// 停车后读取的车速/加速度是交通控制服务器当前报告的值。
    #[instrument(name = "hazard_stop", skip_all, fields(vehicle_id = %external_id, index = index))]
    pub fn on_stop(
        &mut self,
        external_id: &str,
        index: usize,
        handle: &ExternalHandleCache,
        now: SimTime,
    ) -> traffic_control::Result<HazardNotice> {
        let Some(stop) = self.stops.get(index) else {
            return Err(contracts::ContractError::lifecycle(
                external_id,
                format!("no stop action #{index}"),
            )
            .into());
        };

        let vehicle = handle.vehicle(external_id)?;
        vehicle.set_speed(Speed::Known(0.0))?;
        let road_id = vehicle.road_id()?;
        let road_speed = vehicle.speed()?.known().unwrap_or(0.0);
        let acceleration = vehicle.accel()?;

        self.color = Some(stop.color.clone());
        self.forwarded = false;

        info!(
            label = %stop.label,
            road_id = %road_id,
            road_speed,
            acceleration,
            "vehicle stopped, broadcasting hazard"
        );

        Ok(HazardNotice {
            sender: external_id.to_string(),
            label: stop.label.clone(),
            road_id,
            road_speed,
            acceleration,
            road_humidity: stop.road_humidity.clone(),
            sent_at: now,
        })
    }

    /// 恢复行驶：交还速度控制
    #[instrument(name = "hazard_resume", skip_all, fields(vehicle_id = %external_id))]
    pub fn on_resume(
        external_id: &str,
        handle: &ExternalHandleCache,
    ) -> traffic_control::Result<()> {
        handle.vehicle(external_id)?.set_speed(Speed::Unknown)?;
        info!("vehicle resumed");
        Ok(())
    }

    /// 处理收到的告警，返回需要转发的确认 (每次停车后只转发一次)
    ///
    /// 改道失败只记录日志，不影响转发。
    pub fn on_notice(
        &mut self,
        external_id: &str,
        notice: &HazardNotice,
        handle: &ExternalHandleCache,
        now: SimTime,
    ) -> Option<HazardNotice> {
        self.color = Some(RECEIVER_COLOR.to_string());

        let rerouted = handle
            .vehicle(external_id)
            .and_then(|v| v.change_route(&notice.road_id, REROUTE_EXTENT_M));
        if let Err(e) = rerouted {
            warn!(vehicle_id = external_id, road_id = %notice.road_id, error = %e, "reroute failed");
        }

        info!(
            vehicle_id = external_id,
            from = %notice.sender,
            label = %notice.label,
            speed = notice.road_speed,
            acceleration = notice.acceleration,
            humidity = %notice.road_humidity,
            "hazard notice received"
        );
        self.received.push(notice.clone());

        if self.forwarded {
            return None;
        }
        self.forwarded = true;

        Some(HazardNotice {
            sender: external_id.to_string(),
            label: ACKNOWLEDGE_LABEL.to_string(),
            sent_at: now,
            ..notice.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Coord, TelemetrySource};
    use std::sync::Arc;
    use traffic_control::{MockCommand, MockTrafficManager, ScenarioManager};

    fn stop(at_s: f64) -> StopConfig {
        StopConfig {
            at_s,
            resume_after_s: 12.0,
            label: "obstacle!".to_string(),
            road_humidity: "80".to_string(),
            color: "green".to_string(),
        }
    }

    fn manager() -> Arc<MockTrafficManager> {
        let manager = Arc::new(MockTrafficManager::new());
        manager.add_vehicle("veh0", "12", Coord::zeros(), 0.0, 10.0);
        manager.add_vehicle("veh1", "12", Coord::new(-30.0, 0.0, 0.0), 0.0, 10.0);
        manager.telemetry().poll(SimTime::ZERO);
        manager
    }

    #[test]
    fn test_stop_builds_notice() {
        let manager = manager();
        let handle = ExternalHandleCache::new(manager.locator());
        let mut app = HazardApp::new(vec![stop(15.0)]);

        let notice = app
            .on_stop("veh0", 0, &handle, SimTime::from_secs(15.0))
            .unwrap();

        assert_eq!(notice.sender, "veh0");
        assert_eq!(notice.label, "obstacle!");
        assert_eq!(notice.road_id, "12");
        assert_eq!(notice.road_humidity, "80");
        assert_eq!(app.color(), Some("green"));
        assert!(matches!(
            manager.commands()[0],
            MockCommand::SetSpeed {
                speed: Speed::Known(v),
                ..
            } if v == 0.0
        ));
    }

    #[test]
    fn test_unknown_stop_index() {
        let manager = manager();
        let handle = ExternalHandleCache::new(manager.locator());
        let mut app = HazardApp::new(Vec::new());
        assert!(app.on_stop("veh0", 0, &handle, SimTime::ZERO).is_err());
    }

    #[test]
    fn test_resume_releases_speed() {
        let manager = manager();
        let handle = ExternalHandleCache::new(manager.locator());
        HazardApp::on_resume("veh0", &handle).unwrap();
        assert!(matches!(
            manager.commands()[0],
            MockCommand::SetSpeed {
                speed: Speed::Unknown,
                ..
            }
        ));
    }

    #[test]
    fn test_notice_reroutes_and_forwards_once() {
        let manager = manager();
        let handle = ExternalHandleCache::new(manager.locator());
        let mut sender = HazardApp::new(vec![stop(15.0)]);
        let notice = sender
            .on_stop("veh0", 0, &handle, SimTime::from_secs(15.0))
            .unwrap();

        let receiver_handle = ExternalHandleCache::new(manager.locator());
        let mut receiver = HazardApp::default();
        let reply = receiver
            .on_notice("veh1", &notice, &receiver_handle, SimTime::from_secs(16.0))
            .unwrap();
        assert_eq!(reply.label, ACKNOWLEDGE_LABEL);
        assert_eq!(reply.sender, "veh1");
        assert_eq!(reply.road_id, "12");
        assert_eq!(receiver.color(), Some(RECEIVER_COLOR));

        assert!(receiver
            .on_notice("veh1", &reply, &receiver_handle, SimTime::from_secs(17.0))
            .is_none());
        assert_eq!(receiver.received().len(), 2);

        let reroutes = manager
            .commands()
            .into_iter()
            .filter(|c| {
                matches!(c, MockCommand::ChangeRoute { external_id, extent_m, .. }
                    if external_id == "veh1" && *extent_m == REROUTE_EXTENT_M)
            })
            .count();
        assert_eq!(reroutes, 2);
    }

    #[test]
    fn test_reroute_failure_still_forwards() {
        let handle = ExternalHandleCache::new(Arc::new(|| None::<Arc<dyn ScenarioManager>>));
        let notice = HazardNotice {
            sender: "veh0".to_string(),
            label: "obstacle!".to_string(),
            road_id: "3".to_string(),
            road_speed: 0.0,
            acceleration: 0.0,
            road_humidity: String::new(),
            sent_at: SimTime::ZERO,
        };
        let mut app = HazardApp::default();
        assert!(app.on_notice("veh1", &notice, &handle, SimTime::ZERO).is_some());
    }
}
