//! Telemetry Replay - 从录制文件回放车辆遥测
//!
//! 读取 JSONL 记录 (每行一条 `{time, id, x, y, z, road_id, speed, angle}`)，
//! 按时间戳排序后随仿真时钟推进逐步产出。`speed = -1` 表示速度未知。

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use contracts::{Coord, SimTime, Speed, TelemetryEvent, TelemetryReport, TelemetrySource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{Result, TrafficControlError};

/// JSONL 中的单条遥测记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// 仿真时间 (秒)
    pub time: f64,
    /// 车辆 external id
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub road_id: String,
    pub speed: Speed,
    /// 朝向 (弧度)
    #[serde(default)]
    pub angle: f64,
}

impl ReplayRecord {
    fn report(&self) -> TelemetryReport {
        TelemetryReport {
            external_id: self.id.clone(),
            position: Coord::new(self.x, self.y, self.z),
            road_id: self.road_id.clone(),
            speed: self.speed,
            angle: self.angle,
        }
    }
}

/// 录制遥测回放源
#[derive(Debug)]
pub struct TelemetryReplay {
    records: Vec<ReplayRecord>,
    cursor: usize,
    /// 每辆车最后一条记录的时间
    last_seen: HashMap<String, SimTime>,
    /// 已产出过报告、尚未离开的车辆 (按首次出现顺序)
    active: Vec<String>,
}

impl TelemetryReplay {
    /// 从 JSONL 文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let replay = Self::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            records = replay.records.len(),
            vehicles = replay.last_seen.len(),
            "Loaded telemetry replay"
        );
        Ok(replay)
    }

    /// 从任意 reader 解析 JSONL
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ReplayRecord =
                serde_json::from_str(&line).map_err(|e| TrafficControlError::ReplayParse {
                    line: index + 1,
                    message: e.to_string(),
                })?;

            if !record.time.is_finite() || record.id.is_empty() {
                return Err(TrafficControlError::ReplayParse {
                    line: index + 1,
                    message: "record needs a finite time and a non-empty id".into(),
                });
            }
            records.push(record);
        }

        Ok(Self::from_records(records))
    }

    /// 从内存中的记录构建 (按时间稳定排序)
    pub fn from_records(mut records: Vec<ReplayRecord>) -> Self {
        records.sort_by(|a, b| a.time.total_cmp(&b.time));

        let mut last_seen = HashMap::new();
        for record in &records {
            last_seen.insert(record.id.clone(), SimTime::from_secs(record.time));
        }

        Self {
            records,
            cursor: 0,
            last_seen,
            active: Vec::new(),
        }
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 所有记录已产出且所有车辆已离开
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.records.len() && self.active.is_empty()
    }
}

impl TelemetrySource for TelemetryReplay {
    /// 产出 `time <= now` 的所有新记录
    ///
    /// 同一次 poll 中同一车辆只产出最新的一条，保证每个时刻最多一次更新。
    #[instrument(name = "telemetry_replay_poll", level = "trace", skip(self), fields(now = %now))]
    fn poll(&mut self, now: SimTime) -> Vec<TelemetryEvent> {
        let mut latest: Vec<&ReplayRecord> = Vec::new();
        while let Some(record) = self.records.get(self.cursor) {
            if SimTime::from_secs(record.time) > now {
                break;
            }
            match latest.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record,
                None => latest.push(record),
            }
            self.cursor += 1;
        }

        let reported: Vec<String> = latest.iter().map(|r| r.id.clone()).collect();
        let mut events: Vec<TelemetryEvent> = Vec::with_capacity(latest.len());
        for record in latest {
            if !self.active.contains(&record.id) {
                self.active.push(record.id.clone());
            }
            events.push(TelemetryEvent::Report(record.report()));
        }

        let last_seen = &self.last_seen;
        let mut departed = Vec::new();
        self.active.retain(|id| {
            let gone = !reported.contains(id) && last_seen.get(id).is_some_and(|last| now > *last);
            if gone {
                departed.push(id.clone());
            }
            !gone
        });
        for external_id in departed {
            debug!(vehicle_id = %external_id, "replayed vehicle departed");
            events.push(TelemetryEvent::Departed { external_id });
        }

        events
    }
}
