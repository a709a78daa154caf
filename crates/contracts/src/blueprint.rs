//! ScenarioBlueprint - Config Loader 输出
//!
//! 描述完整的场景配置：世界参数、车辆、定时停车动作、结果输出。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Location;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的场景配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 世界设置
    pub world: WorldConfig,

    /// 车辆定义列表
    pub vehicles: Vec<VehicleConfig>,

    /// 结果输出配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 世界配置：场景名称、步长、时长
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// 场景名称
    pub name: String,

    /// 仿真步长 (秒)，必须 > 0
    #[serde(default = "default_step_s")]
    pub step_s: f64,

    /// 仿真总时长 (秒)
    #[serde(default = "default_duration_s")]
    pub duration_s: f64,

    /// 交通控制服务器地址
    #[serde(default = "default_traci_host")]
    pub traci_host: String,

    /// 交通控制服务器端口
    #[serde(default = "default_traci_port")]
    pub traci_port: u16,
}

fn default_step_s() -> f64 {
    1.0
}

fn default_duration_s() -> f64 {
    60.0
}

fn default_traci_host() -> String {
    "localhost".to_string()
}

fn default_traci_port() -> u16 {
    9999
}

/// 车辆配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// 唯一标识符 (交通控制服务器使用的 external id)
    pub id: String,

    /// 初始道路 ID
    #[serde(default)]
    pub road_id: String,

    /// 初始位置
    pub spawn: Location,

    /// 初始朝向 (弧度，+x 方向为 0，顺时针增加)
    #[serde(default)]
    pub angle: f64,

    /// 期望速度 (m/s)
    pub desired_speed: f64,

    /// 进入仿真的时间 (秒)
    #[serde(default)]
    pub depart_s: f64,

    /// 离开仿真的时间 (秒)，None = 一直运行到结束
    #[serde(default)]
    pub arrive_s: Option<f64>,

    /// 定时停车动作
    #[serde(default)]
    pub stops: Vec<StopConfig>,
}

/// 定时停车动作：在 `at_s` 停车并广播告警，`resume_after_s` 后恢复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopConfig {
    /// 停车时间 (绝对仿真时间，秒)
    pub at_s: f64,

    /// 停车持续时间 (秒)
    pub resume_after_s: f64,

    /// 告警名称
    #[serde(default = "default_stop_label")]
    pub label: String,

    /// 告警中携带的路面湿度
    #[serde(default)]
    pub road_humidity: String,

    /// 停车时主机图标颜色
    #[serde(default = "default_stop_color")]
    pub color: String,
}

fn default_stop_label() -> String {
    "obstacle!".to_string()
}

fn default_stop_color() -> String {
    "green".to_string()
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 内存保存 (测试用)
    Memory,
    /// JSON 文件输出
    JsonFile,
}

impl ScenarioBlueprint {
    /// 根据 ID 查找车辆
    pub fn vehicle(&self, id: &str) -> Option<&VehicleConfig> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// 所有车辆的定时停车动作总数
    pub fn stop_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.stops.len()).sum()
    }
}
