//! 投递指标收集模块
//!
//! 记录 worker 投递、丢弃和 telemetry 旁路的运行指标。

use metrics::{counter, histogram};

/// 记录一次成功投递
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_batch_delivered;
///
/// let written = sink.deliver(&payload, true).await?;
/// record_batch_delivered(sink.destination(), written, true);
/// ```
pub fn record_batch_delivered(destination: &str, body_bytes: usize, compressed: bool) {
    let encoding = if compressed { "gzip" } else { "identity" };
    counter!(
        "bulkload_batches_delivered_total",
        "destination" => destination.to_string(),
        "encoding" => encoding
    )
    .increment(1);

    counter!(
        "bulkload_body_bytes_total",
        "destination" => destination.to_string()
    )
    .increment(body_bytes as u64);

    histogram!("bulkload_body_bytes").record(body_bytes as f64);
}

/// 记录 do-load 关闭时被丢弃的批次
pub fn record_batch_discarded() {
    counter!("bulkload_batches_discarded_total").increment(1);
}

/// 记录投递失败
pub fn record_delivery_failure(destination: &str) {
    counter!(
        "bulkload_delivery_failures_total",
        "destination" => destination.to_string()
    )
    .increment(1);
}

/// 记录 telemetry intake 满时丢弃的点
pub fn record_telemetry_dropped() {
    counter!("bulkload_telemetry_points_dropped_total").increment(1);
}

/// 记录 telemetry flush
pub fn record_telemetry_flush(points: usize, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("bulkload_telemetry_flushes_total", "status" => status).increment(1);
    counter!("bulkload_telemetry_points_total", "status" => status).increment(points as u64);
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

    /// 合并另一个 worker 的统计 (Chan 并行公式)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;

        self.count = count;
        self.mean = mean;
        self.m2 = m2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
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
