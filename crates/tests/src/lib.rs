//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约与配置快照测试
//! - 跟踪器 + 交通控制 mock 的跨 crate 行为
//! - 模拟 e2e 测试（无需交通控制服务器）

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigVersion, SimTime, Speed};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_speed_sentinel_on_the_wire() {
        let speed: Speed = serde_json::from_str("-1").unwrap();
        assert_eq!(speed, Speed::Unknown);
        assert_eq!(serde_json::to_string(&Speed::Unknown).unwrap(), "-1.0");
        assert_eq!(serde_json::from_str::<Speed>("13.9").unwrap(), Speed::Known(13.9));
    }

    #[test]
    fn test_sim_time_ordering() {
        let mut times = vec![
            SimTime::from_secs(24.0),
            SimTime::from_secs(15.0),
            SimTime::from_secs(27.0),
        ];
        times.sort();
        assert_eq!(
            times.iter().map(|t| t.as_secs()).collect::<Vec<_>>(),
            vec![15.0, 24.0, 27.0]
        );
    }

    #[test]
    fn test_sample_scenario_is_valid() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            include_str!("../../../scenarios/hazard.toml"),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.world.name, "hazard");
        assert_eq!(blueprint.vehicles.len(), 5);
        assert_eq!(blueprint.stop_count(), 2);

        let veh4 = blueprint.vehicle("veh4").unwrap();
        assert_eq!(veh4.stops[0].label, "accident!");
        assert_eq!(veh4.stops[0].color, "red");
        assert_eq!(blueprint.vehicle("veh0").unwrap().stops[0].label, "obstacle!");
    }
}

#[cfg(test)]
mod tracker_tests {
    use std::sync::{Arc, Mutex};

    use contracts::{
        ContractError, Coord, SampleLog, SampleRecorder, SimTime, Speed, TelemetryEvent,
        TelemetryReport, TelemetrySource,
    };
    use mobility::{KinematicStateTracker, TrackerPhase};
    use results::MemoryScalarSink;
    use traffic_control::MockTrafficManager;

    const EPS: f64 = 1e-9;

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    fn report(x: f64, speed: Speed, angle: f64) -> TelemetryReport {
        TelemetryReport {
            external_id: "veh0".to_string(),
            position: Coord::new(x, 0.0, 0.0),
            road_id: "7".to_string(),
            speed,
            angle,
        }
    }

    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<SampleLog>>);

    impl SampleRecorder for SharedLog {
        fn record_speed(&mut self, id: &str, time: SimTime, speed: f64) {
            self.0.lock().unwrap().record_speed(id, time, speed);
        }

        fn record_acceleration(&mut self, id: &str, time: SimTime, acceleration: f64) {
            self.0
                .lock()
                .unwrap()
                .record_acceleration(id, time, acceleration);
        }
    }

    /// Seed at t=0 with 10 m/s, update at t=1 with 20 m/s
    #[test]
    fn test_seed_then_update_exports_statistics() {
        let log = SharedLog::default();
        let mut tracker = KinematicStateTracker::new().with_recorder(Box::new(log.clone()));

        tracker.apply(&report(0.0, Speed::Known(10.0), 0.0), t(0.0)).unwrap();
        assert_eq!(tracker.phase(), TrackerPhase::Active);
        tracker.apply(&report(20.0, Speed::Known(20.0), 0.0), t(1.0)).unwrap();

        assert!((tracker.current_velocity() - Coord::new(20.0, 0.0, 0.0)).norm() < EPS);
        assert_eq!(log.0.lock().unwrap().acceleration, vec![(t(1.0), 10.0)]);

        let mut sink = MemoryScalarSink::new("memory");
        let scalars = sink.log();
        tracker.finish(t(1.0), &mut sink).unwrap();

        assert_eq!(scalars.get("veh0.mobility", "totalTime"), Some(1.0));
        assert_eq!(scalars.get("veh0.mobility", "minSpeed"), Some(20.0));
        assert_eq!(scalars.get("veh0.mobility", "maxSpeed"), Some(20.0));
        assert_eq!(scalars.get("veh0.mobility", "firstRoadNumber"), Some(7.0));
        assert_eq!(scalars.get("veh0.mobility", "totalDistance"), Some(0.0));
    }

    #[test]
    fn test_heading_conventions() {
        let mut tracker = KinematicStateTracker::new();
        let angle = std::f64::consts::FRAC_PI_2;
        tracker.apply(&report(0.0, Speed::Known(5.0), angle), t(0.0)).unwrap();

        // 90° 朝向：速度指向 -y
        let v = tracker.current_velocity();
        assert!(v.x.abs() < EPS);
        assert!((v.y + 5.0).abs() < EPS);

        let (_, _, yaw) = tracker.current_orientation().euler_angles();
        assert!((yaw + angle).abs() < EPS);

        tracker.apply(&report(1.0, Speed::Unknown, angle), t(1.0)).unwrap();
        assert_eq!(tracker.current_velocity(), Coord::zeros());
    }

    #[test]
    fn test_one_update_per_timestamp() {
        let mut tracker = KinematicStateTracker::new();
        tracker.apply(&report(0.0, Speed::Known(1.0), 0.0), t(0.0)).unwrap();
        tracker.apply(&report(1.0, Speed::Known(1.0), 0.0), t(2.0)).unwrap();

        let duplicate = tracker.apply(&report(9.0, Speed::Known(9.0), 0.0), t(2.0));
        assert!(matches!(duplicate, Err(ContractError::DuplicateUpdate { .. })));

        let older = tracker.apply(&report(9.0, Speed::Known(9.0), 0.0), t(1.0));
        assert!(matches!(older, Err(ContractError::NonMonotonicUpdate { .. })));

        assert_eq!(tracker.current_position(), Coord::new(1.0, 0.0, 0.0));
        assert_eq!(tracker.last_update_time(), Some(t(2.0)));
    }

    #[test]
    fn test_unknown_speed_breaks_acceleration_chain() {
        let log = SharedLog::default();
        let mut tracker = KinematicStateTracker::new().with_recorder(Box::new(log.clone()));

        tracker.apply(&report(0.0, Speed::Known(10.0), 0.0), t(0.0)).unwrap();
        tracker.apply(&report(1.0, Speed::Known(12.0), 0.0), t(1.0)).unwrap();
        tracker.apply(&report(2.0, Speed::Unknown, 0.0), t(2.0)).unwrap();
        tracker.apply(&report(3.0, Speed::Known(4.0), 0.0), t(3.0)).unwrap();
        tracker.apply(&report(4.0, Speed::Known(6.0), 0.0), t(4.0)).unwrap();

        let log = log.0.lock().unwrap();
        assert_eq!(log.acceleration, vec![(t(1.0), 2.0), (t(4.0), 2.0)]);
        assert_eq!(log.speed.len(), 3);

        let snapshot = tracker.statistics().snapshot();
        assert_eq!(snapshot.min_speed, Some(4.0));
        assert_eq!(snapshot.max_speed, Some(12.0));
        assert_eq!(snapshot.total_time, 4.0);
    }

    #[test]
    fn test_finish_without_updates_omits_speed_bounds() {
        let mut tracker = KinematicStateTracker::new();
        tracker.apply(&report(0.0, Speed::Known(10.0), 0.0), t(3.0)).unwrap();

        let mut sink = MemoryScalarSink::new("memory");
        let scalars = sink.log();
        let snapshot = tracker.finish(t(8.0), &mut sink).unwrap().clone();

        assert_eq!(snapshot.total_time, 0.0);
        assert_eq!(snapshot.min_speed, None);
        assert_eq!(scalars.get("veh0.mobility", "startTime"), Some(3.0));
        assert_eq!(scalars.get("veh0.mobility", "stopTime"), Some(8.0));
        assert_eq!(scalars.get("veh0.mobility", "minSpeed"), None);
        assert_eq!(scalars.get("veh0.mobility", "maxSpeed"), None);

        assert!(tracker.finish(t(9.0), &mut sink).is_err());
    }

    #[test]
    fn test_tracker_follows_mock_telemetry() {
        let manager = MockTrafficManager::new();
        manager.add_vehicle("veh0", "3", Coord::zeros(), 0.0, 10.0);
        let mut telemetry = manager.telemetry();
        let mut tracker = KinematicStateTracker::new();

        for secs in 0..=5 {
            let now = t(secs as f64);
            for event in telemetry.poll(now) {
                if let TelemetryEvent::Report(report) = event {
                    tracker.apply(&report, now).unwrap();
                }
            }
        }

        assert!((tracker.current_position().x - 50.0).abs() < EPS);
        assert_eq!(tracker.statistics().snapshot().total_time, 5.0);
        assert_eq!(tracker.statistics().snapshot().first_road_number, Some(3.0));
    }
}

#[cfg(test)]
mod handle_cache_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use contracts::{Coord, SimTime, Speed, TelemetrySource};
    use traffic_control::{
        ExternalHandleCache, ManagerLocator, MockCommand, MockTrafficManager, ScenarioManager,
        TrafficControlError,
    };

    #[test]
    fn test_locator_consulted_once() {
        let manager = Arc::new(MockTrafficManager::new());
        manager.add_vehicle("veh0", "1", Coord::zeros(), 0.0, 10.0);
        manager.telemetry().poll(SimTime::ZERO);

        let calls = Arc::new(AtomicUsize::new(0));
        let locator: Arc<dyn ManagerLocator> = {
            let calls = calls.clone();
            let manager = manager.clone();
            Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(manager.clone() as Arc<dyn ScenarioManager>)
            })
        };

        let cache = ExternalHandleCache::new(locator);
        for _ in 0..3 {
            cache.vehicle("veh0").unwrap().set_speed(Speed::Known(0.0)).unwrap();
        }
        cache.vehicle("veh0").unwrap().change_route("1", 999.9).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.commands().len(), 4);
        assert!(matches!(
            manager.commands()[3],
            MockCommand::ChangeRoute { extent_m, .. } if extent_m == 999.9
        ));
    }

    #[test]
    fn test_missing_manager_is_an_error() {
        let cache = ExternalHandleCache::new(Arc::new(|| None::<Arc<dyn ScenarioManager>>));
        assert!(matches!(
            cache.vehicle("veh0"),
            Err(TrafficControlError::ManagerUnavailable { .. })
        ));
        assert!(!cache.has_vehicle());
    }
}

#[cfg(test)]
mod timer_tests {
    use contracts::SimTime;
    use timers::{TimerRegistry, TimerState};

    type Fired = Vec<(f64, &'static str)>;

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs)
    }

    #[test]
    fn test_stop_actions_fire_in_time_order() {
        let mut timers: TimerRegistry<Fired> = TimerRegistry::new();
        let mut fired = Fired::new();

        timers
            .schedule_once_at(t(24.0), |timers, log: &mut Fired| {
                log.push((timers.now().as_secs(), "accident"))
            })
            .unwrap();
        timers
            .schedule_once_at(t(15.0), |timers, log: &mut Fired| {
                log.push((timers.now().as_secs(), "obstacle"));
                timers
                    .schedule_once_in(12.0, |timers, log: &mut Fired| {
                        log.push((timers.now().as_secs(), "resume"))
                    })
                    .unwrap();
            })
            .unwrap();
        let cancelled = timers
            .schedule_once_at(t(20.0), |_, log: &mut Fired| log.push((20.0, "cancelled")))
            .unwrap();

        assert!(timers.cancel(cancelled));
        assert!(!timers.cancel(cancelled));

        assert_eq!(timers.advance_to(t(30.0), &mut fired).unwrap(), 3);
        assert_eq!(
            fired,
            vec![(15.0, "obstacle"), (24.0, "accident"), (27.0, "resume")]
        );
        assert_eq!(timers.state(cancelled), Some(TimerState::Cancelled));
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_periodic_timer_every_five_seconds() {
        let mut timers: TimerRegistry<Fired> = TimerRegistry::new();
        let mut fired = Fired::new();

        let handle = timers
            .schedule_periodic(t(0.0), 5.0, |timers, log: &mut Fired| {
                log.push((timers.now().as_secs(), "tick"))
            })
            .unwrap();

        assert_eq!(timers.advance_to(t(17.0), &mut fired).unwrap(), 4);
        let times: Vec<f64> = fired.iter().map(|(time, _)| *time).collect();
        assert_eq!(times, vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(timers.fire_time(handle), Some(t(20.0)));
    }

    #[test]
    fn test_past_time_rejected() {
        let mut timers: TimerRegistry<Fired> = TimerRegistry::starting_at(t(10.0));
        assert!(timers.schedule_once_at(t(5.0), |_, _| {}).is_err());
        assert!(timers.advance_to(t(9.0), &mut Fired::new()).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;

    use contracts::{
        Location, ScalarRecord, ScenarioBlueprint, SinkConfig, SinkType, Speed, StopConfig,
        VehicleConfig, WorldConfig,
    };
    use mobility_sim_cli::{Simulation, SimulationConfig, TelemetryMode};
    use results::MemoryScalarSink;
    use traffic_control::{MockCommand, MockTrafficManager};

    fn vehicle(id: &str, x: f64, stops: Vec<StopConfig>) -> VehicleConfig {
        VehicleConfig {
            id: id.to_string(),
            road_id: "7".to_string(),
            spawn: Location { x, y: 0.0, z: 0.0 },
            angle: 0.0,
            desired_speed: 10.0,
            depart_s: 0.0,
            arrive_s: None,
            stops,
        }
    }

    fn blueprint(duration_s: f64, vehicles: Vec<VehicleConfig>) -> ScenarioBlueprint {
        ScenarioBlueprint {
            version: Default::default(),
            world: WorldConfig {
                name: "e2e".to_string(),
                step_s: 1.0,
                duration_s,
                traci_host: "localhost".to_string(),
                traci_port: 9999,
            },
            vehicles,
            sinks: Vec::new(),
        }
    }

    fn hazard_blueprint() -> ScenarioBlueprint {
        let stop = StopConfig {
            at_s: 3.0,
            resume_after_s: 4.0,
            label: "obstacle!".to_string(),
            road_humidity: "80".to_string(),
            color: "green".to_string(),
        };
        blueprint(
            10.0,
            vec![
                vehicle("veh0", 0.0, vec![stop]),
                vehicle("veh1", -20.0, Vec::new()),
                vehicle("veh2", -40.0, Vec::new()),
            ],
        )
    }

    /// End-to-end test: MockTrafficManager -> Fleet -> HazardApp -> sinks
    ///
    /// 验证完整的停车告警流程：
    /// 1. t=3 veh0 停车并广播告警，t=7 恢复
    /// 2. 其他车辆改道并各转发一次确认
    /// 3. 结束时所有跟踪器的统计写入 sink
    #[test]
    fn test_e2e_hazard_scenario() {
        let blueprint = hazard_blueprint();
        let manager = Arc::new(MockTrafficManager::from_blueprint(&blueprint));
        let sink = MemoryScalarSink::new("memory");
        let scalars = sink.log();

        let mut simulation = Simulation::new(SimulationConfig::new(blueprint))
            .with_traffic_manager(manager.clone())
            .with_sink(Box::new(sink));
        let stats = simulation.run().unwrap();

        assert_eq!(stats.steps, 11);
        assert_eq!(stats.timers_fired, 2);
        assert_eq!(stats.vehicles, 3);
        assert_eq!(stats.fleet.notices_sent, 4);
        assert_eq!(stats.fleet.notices_delivered, 8);
        assert_eq!(stats.fleet.vehicles_finished, 3);
        assert_eq!(stats.fleet.command_failures, 0);

        let speeds: Vec<Speed> = manager
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::SetSpeed { external_id, speed, .. } if external_id == "veh0" => {
                    Some(speed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(speeds, vec![Speed::Known(0.0), Speed::Unknown]);

        let reroutes = manager
            .commands()
            .iter()
            .filter(|c| matches!(c, MockCommand::ChangeRoute { road_id, .. } if road_id == "7"))
            .count();
        assert_eq!(reroutes, 8);

        let fleet = simulation.fleet().unwrap();
        let veh1 = fleet.node("veh1").unwrap();
        assert_eq!(veh1.app().color(), Some("green"));
        assert_eq!(veh1.app().received().len(), 3);
        assert_eq!(veh1.app().received()[0].label, "obstacle!");
        assert_eq!(veh1.app().received()[0].road_humidity, "80");
        assert_eq!(fleet.node("veh0").unwrap().app().received().len(), 2);

        assert_eq!(scalars.get("veh0.mobility", "minSpeed"), Some(0.0));
        assert_eq!(scalars.get("veh0.mobility", "maxSpeed"), Some(10.0));
        assert_eq!(scalars.get("veh1.mobility", "minSpeed"), Some(10.0));
        assert_eq!(scalars.get("veh2.mobility", "totalTime"), Some(10.0));
    }

    #[test]
    fn test_e2e_sample_scenario() {
        let mut blueprint = config_loader::ConfigLoader::load_from_str(
            include_str!("../../../scenarios/hazard.toml"),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        blueprint.sinks.clear();
        let manager = Arc::new(MockTrafficManager::from_blueprint(&blueprint));

        let mut config = SimulationConfig::new(blueprint);
        config.until = Some(30.0);
        let mut simulation = Simulation::new(config).with_traffic_manager(manager.clone());
        let stats = simulation.run().unwrap();

        // veh4 的恢复定时器在 t=44，不在运行时间内
        assert_eq!(stats.timers_fired, 3);
        assert_eq!(stats.sim_time, 30.0);

        let set_speeds: Vec<(String, Speed)> = manager
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                MockCommand::SetSpeed { external_id, speed, .. } => Some((external_id, speed)),
                _ => None,
            })
            .collect();
        assert_eq!(
            set_speeds,
            vec![
                ("veh0".to_string(), Speed::Known(0.0)),
                ("veh4".to_string(), Speed::Known(0.0)),
                ("veh0".to_string(), Speed::Unknown),
            ]
        );
        assert_eq!(
            simulation.fleet().unwrap().node("veh4").unwrap().app().color(),
            Some("red")
        );
    }

    #[test]
    fn test_e2e_replay_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in [
            r#"{"time": 0.0, "id": "a", "x": 0.0, "y": 0.0, "road_id": "12", "speed": 10.0}"#,
            r#"{"time": 0.0, "id": "b", "x": 5.0, "y": 5.0, "road_id": "x", "speed": 2.0}"#,
            r#"{"time": 1.0, "id": "a", "x": 20.0, "y": 0.0, "road_id": "12", "speed": 20.0}"#,
            r#"{"time": 1.0, "id": "b", "x": 9.0, "y": 5.0, "road_id": "x", "speed": 4.0}"#,
            r#"{"time": 2.0, "id": "a", "x": 30.0, "y": 0.0, "road_id": "12", "speed": -1}"#,
            r#"{"time": 3.0, "id": "a", "x": 35.0, "y": 0.0, "road_id": "12", "speed": 5.0}"#,
        ] {
            writeln!(file, "{line}").unwrap();
        }
        drop(file);

        let sink = MemoryScalarSink::new("memory");
        let scalars = sink.log();
        let mut config = SimulationConfig::new(blueprint(4.0, Vec::new()));
        config.telemetry = TelemetryMode::Replay(path);
        let stats = Simulation::new(config)
            .with_sink(Box::new(sink))
            .run()
            .unwrap();

        assert_eq!(stats.vehicles, 2);
        assert_eq!(stats.fleet.vehicles_finished, 2);
        assert_eq!(stats.mobility.total_samples, 3);
        assert_eq!(stats.mobility.acceleration.count, 2);

        // b 在 t=2 离开
        assert_eq!(scalars.get("b.mobility", "stopTime"), Some(2.0));
        assert_eq!(scalars.get("b.mobility", "totalTime"), Some(1.0));
        assert_eq!(scalars.get("b.mobility", "firstRoadNumber"), None);

        assert_eq!(scalars.get("a.mobility", "stopTime"), Some(4.0));
        assert_eq!(scalars.get("a.mobility", "totalTime"), Some(3.0));
        assert_eq!(scalars.get("a.mobility", "minSpeed"), Some(5.0));
        assert_eq!(scalars.get("a.mobility", "maxSpeed"), Some(20.0));
        assert_eq!(scalars.get("a.mobility", "firstRoadNumber"), Some(12.0));
    }

    #[test]
    fn test_e2e_json_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scalars.jsonl");

        let mut blueprint = blueprint(5.0, vec![vehicle("veh0", 0.0, Vec::new())]);
        blueprint.sinks = vec![
            SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                params: HashMap::new(),
            },
            SinkConfig {
                name: "file".to_string(),
                sink_type: SinkType::JsonFile,
                params: HashMap::from([(
                    "path".to_string(),
                    path.display().to_string(),
                )]),
            },
        ];

        let stats = Simulation::new(SimulationConfig::new(blueprint))
            .run()
            .unwrap();
        assert_eq!(stats.sinks.len(), 2);
        assert!(stats.sinks.iter().all(|(_, m)| m.failure_count == 0));

        let records: Vec<ScalarRecord> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let total_time = records
            .iter()
            .find(|r| r.owner == "veh0.mobility" && r.name == "totalTime")
            .unwrap();
        assert_eq!(total_time.value, 5.0);
        assert_eq!(records.len(), 8);
    }

    /// 与 `run` 命令相同：在阻塞线程中运行模拟
    #[tokio::test]
    async fn test_simulation_in_blocking_task() {
        let mut simulation = Simulation::new(SimulationConfig::new(hazard_blueprint()));
        let shutdown = simulation.shutdown_handle();

        let handle = tokio::task::spawn_blocking(move || simulation.run());
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;

        assert!(result.is_ok(), "Test timed out");
        let stats = result.unwrap().unwrap().unwrap();
        assert!(!stats.interrupted);
        assert!(!shutdown.load(std::sync::atomic::Ordering::Relaxed));
    }
}
