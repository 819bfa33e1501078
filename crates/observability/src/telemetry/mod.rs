//! Telemetry 旁路
//!
//! Worker 通过 [`TelemetryHandle::emit`] 非阻塞地提交点；intake 满时直接丢弃。
//! 后台 flusher 按批大小或时间间隔把点交给 collector，失败只记录日志。
//! [`TelemetryTask::shutdown`] 关闭 intake、排空剩余点后返回统计。

mod collectors;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{TelemetryCollector, TelemetryPoint};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use collectors::{InfluxCollector, StderrCollector, TelemetryCollectors};

use crate::metrics::{record_telemetry_dropped, record_telemetry_flush};

/// Telemetry sink 运行参数
#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    /// 每次 flush 的最大点数
    pub batch_size: usize,
    /// 未满批时的最长等待
    pub flush_interval: Duration,
    /// intake 队列容量
    pub queue_capacity: usize,
    /// 附加到每个点上的静态 tag
    pub tags: Vec<(String, String)>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: Duration::from_secs(1),
            queue_capacity: 10_000,
            tags: Vec::new(),
        }
    }
}

impl From<&contracts::TelemetryConfig> for TelemetrySettings {
    fn from(config: &contracts::TelemetryConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
            queue_capacity: config.queue_capacity.max(1),
            tags: config
                .tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Worker 端持有的提交句柄
#[derive(Debug, Clone)]
pub struct TelemetryHandle {
    tx: mpsc::Sender<TelemetryPoint>,
    hostname: Arc<str>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryHandle {
    /// 提交一个点，永不阻塞
    ///
    /// 返回 `false` 表示该点被丢弃（intake 已满或已关闭）。
    pub fn emit(&self, point: TelemetryPoint) -> bool {
        match self.tx.try_send(point) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                record_telemetry_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// 本机标识，用作 `src_addr`
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// 因 intake 满而丢弃的点数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Telemetry 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub received: u64,
    pub sent: u64,
    pub failed: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub dropped: u64,
}

/// 后台 flusher 的控制句柄
#[derive(Debug)]
pub struct TelemetryTask {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<TelemetryStats>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryTask {
    /// 关闭 intake，排空剩余点，等待 flusher 结束
    pub async fn shutdown(self) -> TelemetryStats {
        let _ = self.shutdown.send(());
        let mut stats = match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Telemetry flusher terminated abnormally");
                TelemetryStats::default()
            }
        };
        stats.dropped = self.dropped.load(Ordering::Relaxed);
        stats
    }
}

/// 启动 telemetry sink
///
/// 必须在 tokio runtime 中调用。
pub fn spawn_telemetry<C>(
    collector: C,
    settings: TelemetrySettings,
    hostname: impl Into<Arc<str>>,
) -> (TelemetryHandle, TelemetryTask)
where
    C: TelemetryCollector + 'static,
{
    let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let dropped = Arc::new(AtomicU64::new(0));

    info!(
        collector = collector.name(),
        batch_size = settings.batch_size,
        flush_interval_ms = settings.flush_interval.as_millis() as u64,
        "Telemetry sink started"
    );

    let join = tokio::spawn(flush_loop(collector, settings, rx, shutdown_rx));

    let handle = TelemetryHandle {
        tx,
        hostname: hostname.into(),
        dropped: Arc::clone(&dropped),
    };
    let task = TelemetryTask {
        shutdown: shutdown_tx,
        join,
        dropped,
    };

    (handle, task)
}

async fn flush_loop<C: TelemetryCollector>(
    mut collector: C,
    settings: TelemetrySettings,
    mut rx: mpsc::Receiver<TelemetryPoint>,
    mut shutdown: oneshot::Receiver<()>,
) -> TelemetryStats {
    let batch_size = settings.batch_size.max(1);
    let mut buffer = Vec::with_capacity(batch_size);
    let mut stats = TelemetryStats::default();
    let mut closing = false;

    let mut ticker = tokio::time::interval(settings.flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(mut point) => {
                    stats.received += 1;
                    point.tags.extend(settings.tags.iter().cloned());
                    buffer.push(point);
                    if buffer.len() >= batch_size {
                        flush(&mut collector, &mut buffer, &mut stats).await;
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(&mut collector, &mut buffer, &mut stats).await;
                }
            }
            _ = &mut shutdown, if !closing => {
                debug!("Telemetry intake closing");
                closing = true;
                rx.close();
            }
        }
    }

    if !buffer.is_empty() {
        flush(&mut collector, &mut buffer, &mut stats).await;
    }

    info!(
        received = stats.received,
        sent = stats.sent,
        failed = stats.failed,
        "Telemetry sink drained"
    );
    stats
}

async fn flush<C: TelemetryCollector>(
    collector: &mut C,
    buffer: &mut Vec<TelemetryPoint>,
    stats: &mut TelemetryStats,
) {
    let count = buffer.len();
    stats.flushes += 1;

    match collector.send(buffer.as_slice()).await {
        Ok(()) => {
            stats.sent += count as u64;
            record_telemetry_flush(count, true);
        }
        Err(e) => {
            stats.failed += count as u64;
            stats.failed_flushes += 1;
            record_telemetry_flush(count, false);
            warn!(
                collector = collector.name(),
                points = count,
                error = %e,
                "Telemetry flush failed"
            );
        }
    }

    buffer.clear();
}
