//! 车辆移动性指标收集模块
//!
//! 把 tracker / 定时器 / sink 的运行情况写入 `metrics` facade，
//! 并在内存中聚合运行摘要。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{SampleRecorder, SimTime};
use metrics::{counter, gauge, histogram};

/// 记录一次被接受的运动学更新
pub fn record_mobility_update(external_id: &str) {
    counter!("mobility_updates_total").increment(1);
    counter!(
        "mobility_vehicle_updates_total",
        "vehicle_id" => external_id.to_string()
    )
    .increment(1);
}

/// 记录速度样本
pub fn record_speed_sample(external_id: &str, speed: f64) {
    gauge!("mobility_speed", "vehicle_id" => external_id.to_string()).set(speed);
    histogram!("mobility_speed_hist").record(speed);
}

/// 记录加速度样本
pub fn record_acceleration_sample(external_id: &str, acceleration: f64) {
    gauge!(
        "mobility_acceleration",
        "vehicle_id" => external_id.to_string()
    )
    .set(acceleration);
    histogram!("mobility_acceleration_hist").record(acceleration);
}

/// 记录被拒绝的更新 (契约违反)
pub fn record_update_rejected(external_id: &str, reason: &str) {
    counter!(
        "mobility_updates_rejected_total",
        "vehicle_id" => external_id.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录定时器触发
pub fn record_timer_fired(periodic: bool) {
    let kind = if periodic { "periodic" } else { "once" };
    counter!("timers_fired_total", "kind" => kind).increment(1);
}

/// 记录待触发定时器数量
pub fn record_timers_pending(pending: usize) {
    gauge!("timers_pending").set(pending as f64);
}

/// 记录标量分发
pub fn record_scalar_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "results_scalars_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录活动车辆数
pub fn record_active_vehicles(count: usize) {
    gauge!("mobility_active_vehicles").set(count as f64);
}

/// 把速度/加速度样本转发到 metrics facade 的 `SampleRecorder`
///
/// 可选地共享一个内存聚合器，用于运行结束时打印摘要。
#[derive(Debug, Clone, Default)]
pub struct MetricsSampleRecorder {
    aggregator: Option<Arc<Mutex<MobilityMetricsAggregator>>>,
}

impl MetricsSampleRecorder {
    /// 只写 metrics facade
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时写入共享聚合器
    pub fn with_aggregator(aggregator: Arc<Mutex<MobilityMetricsAggregator>>) -> Self {
        Self {
            aggregator: Some(aggregator),
        }
    }

    fn aggregate(&self, f: impl FnOnce(&mut MobilityMetricsAggregator)) {
        if let Some(aggregator) = &self.aggregator {
            f(&mut aggregator.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

impl SampleRecorder for MetricsSampleRecorder {
    fn record_speed(&mut self, external_id: &str, _time: SimTime, speed: f64) {
        record_speed_sample(external_id, speed);
        self.aggregate(|agg| agg.push_speed(external_id, speed));
    }

    fn record_acceleration(&mut self, external_id: &str, _time: SimTime, acceleration: f64) {
        record_acceleration_sample(external_id, acceleration);
        self.aggregate(|agg| agg.push_acceleration(acceleration));
    }
}

/// 移动性指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct MobilityMetricsAggregator {
    /// 速度样本总数
    pub total_samples: u64,

    /// 定时器触发次数
    pub timers_fired: u64,

    /// 被拒绝的更新次数
    pub rejected_updates: u64,

    /// 速度统计
    pub speed_stats: RunningStats,

    /// 加速度统计
    pub acceleration_stats: RunningStats,

    /// 各车辆样本数
    pub vehicle_samples: HashMap<String, u64>,
}

impl MobilityMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_speed(&mut self, external_id: &str, speed: f64) {
        self.total_samples += 1;
        self.speed_stats.push(speed);
        *self
            .vehicle_samples
            .entry(external_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn push_acceleration(&mut self, acceleration: f64) {
        self.acceleration_stats.push(acceleration);
    }

    pub fn timer_fired(&mut self) {
        self.timers_fired += 1;
    }

    pub fn update_rejected(&mut self) {
        self.rejected_updates += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_samples: self.total_samples,
            vehicles: self.vehicle_samples.len(),
            timers_fired: self.timers_fired,
            rejected_updates: self.rejected_updates,
            speed: StatsSummary::from(&self.speed_stats),
            acceleration: StatsSummary::from(&self.acceleration_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_samples: u64,
    pub vehicles: usize,
    pub timers_fired: u64,
    pub rejected_updates: u64,
    pub speed: StatsSummary,
    pub acceleration: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Mobility Metrics Summary ===")?;
        writeln!(f, "Vehicles: {}", self.vehicles)?;
        writeln!(f, "Speed samples: {}", self.total_samples)?;
        writeln!(f, "Timers fired: {}", self.timers_fired)?;
        if self.rejected_updates > 0 {
            writeln!(f, "Rejected updates: {}", self.rejected_updates)?;
        }
        writeln!(f, "Speed (m/s): {}", self.speed)?;
        writeln!(f, "Acceleration (m/s²): {}", self.acceleration)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
