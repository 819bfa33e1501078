//! Telemetry collectors

use std::io::Write;

use contracts::{ContractError, TelemetryCollector, TelemetryPoint};

use crate::line_protocol::{encode_points, InfluxWriter};

/// 写入 Influx HTTP `/write` 端点
#[derive(Debug, Clone)]
pub struct InfluxCollector {
    name: String,
    writer: InfluxWriter,
}

impl InfluxCollector {
    pub fn new(writer: InfluxWriter) -> Self {
        Self {
            name: format!("influx({})", writer.write_url()),
            writer,
        }
    }
}

impl TelemetryCollector for InfluxCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, points: &[TelemetryPoint]) -> Result<(), ContractError> {
        if points.is_empty() {
            return Ok(());
        }
        self.writer
            .write(encode_points(points))
            .await
            .map_err(|e| ContractError::telemetry(&self.name, format!("{e:#}")))
    }
}

/// 以 line protocol 写到 stderr
#[derive(Debug, Clone, Default)]
pub struct StderrCollector;

impl TelemetryCollector for StderrCollector {
    fn name(&self) -> &str {
        "stderr"
    }

    async fn send(&mut self, points: &[TelemetryPoint]) -> Result<(), ContractError> {
        let body = encode_points(points);
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(body.as_bytes())
            .map_err(|e| ContractError::telemetry("stderr", e.to_string()))
    }
}

/// 组合 collector：依次发送到所有已配置的目的地
///
/// 任一目的地失败都会报告错误，但其余目的地仍会收到该批次。
#[derive(Debug, Clone, Default)]
pub struct TelemetryCollectors {
    influx: Option<InfluxCollector>,
    stderr: Option<StderrCollector>,
}

impl TelemetryCollectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_influx(mut self, collector: InfluxCollector) -> Self {
        self.influx = Some(collector);
        self
    }

    pub fn with_stderr(mut self) -> Self {
        self.stderr = Some(StderrCollector);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.influx.is_none() && self.stderr.is_none()
    }
}

impl TelemetryCollector for TelemetryCollectors {
    fn name(&self) -> &str {
        match (&self.influx, &self.stderr) {
            (Some(influx), None) => influx.name(),
            (None, Some(_)) => "stderr",
            (Some(_), Some(_)) => "influx+stderr",
            (None, None) => "none",
        }
    }

    async fn send(&mut self, points: &[TelemetryPoint]) -> Result<(), ContractError> {
        let mut result = Ok(());

        if let Some(stderr) = self.stderr.as_mut() {
            if let Err(e) = stderr.send(points).await {
                result = Err(e);
            }
        }

        if let Some(influx) = self.influx.as_mut() {
            if let Err(e) = influx.send(points).await {
                result = Err(e);
            }
        }

        result
    }
}
