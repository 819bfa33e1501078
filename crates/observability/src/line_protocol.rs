//! InfluxDB line protocol 编码与 HTTP 写入
//!
//! 格式: `measurement,tag=v field=1i,other="s" 1700000000000000000`

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use contracts::{FieldValue, TelemetryPoint};

/// 编码单个点并追加到 `out`（以换行结尾）
pub fn encode_point(point: &TelemetryPoint, out: &mut String) {
    escape_into(out, &point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        // Influx rejects empty tag values
        if value.is_empty() {
            continue;
        }
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    let mut first = true;
    for (key, value) in &point.fields {
        out.push(if first { ' ' } else { ',' });
        first = false;
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        encode_field(value, out);
    }

    let _ = write!(out, " {}", point.timestamp_ns);
    out.push('\n');
}

/// 编码一批点
pub fn encode_points(points: &[TelemetryPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 128);
    for point in points {
        encode_point(point, &mut out);
    }
    out
}

fn encode_field(value: &FieldValue, out: &mut String) {
    match value {
        FieldValue::Int(v) => {
            let _ = write!(out, "{v}i");
        }
        FieldValue::Float(v) if v.is_finite() => {
            let _ = write!(out, "{v}");
        }
        FieldValue::Float(_) => out.push('0'),
        FieldValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        FieldValue::Str(v) => {
            out.push('"');
            escape_into(out, v, &['"', '\\']);
            out.push('"');
        }
    }
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Influx `/write` 端点的 HTTP 客户端
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: reqwest::Client,
    write_url: String,
    database: String,
    auth: Option<(String, Option<String>)>,
}

impl InfluxWriter {
    /// 创建写入器
    ///
    /// `host` 形如 `http://localhost:8086`
    pub fn new(host: &str, database: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            write_url: format!("{}/write", host.trim_end_matches('/')),
            database: database.into(),
            auth: None,
        })
    }

    /// 设置 basic auth
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some((user.into(), password));
        self
    }

    /// 从 `user:password` 形式设置 basic auth
    pub fn with_basic_auth_pair(self, pair: &str) -> Self {
        match pair.split_once(':') {
            Some((user, password)) => self.with_basic_auth(user, Some(password.to_string())),
            None => self.with_basic_auth(pair, None),
        }
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// POST 一段 line protocol 文本
    pub async fn write(&self, body: String) -> Result<()> {
        let mut request = self
            .client
            .post(&self.write_url)
            .query(&[("db", self.database.as_str())])
            .body(body);

        if let Some((user, password)) = &self.auth {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.write_url))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "{} returned {}: {}",
                self.write_url,
                status,
                text.trim()
            );
        }

        Ok(())
    }
}
