//! 配置校验模块
//!
//! 校验规则：
//! - 数值范围 (workers / batch_size / lines_per_item / item_limit ...)，由 `Validate` derive 完成
//! - target 名称唯一且非空
//! - do_load 时至少一个 target
//! - http target 必须提供 url，file target 必须提供 path
//! - 启用 telemetry 时需要 host 或 stderr
//! - basic_auth 形如 user:password

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, LoaderConfig, SinkType};

/// 校验 LoaderConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &LoaderConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_target_names(config)?;
    validate_target_params(config)?;
    validate_telemetry(config)?;
    Ok(())
}

/// 校验数值范围
fn validate_ranges(config: &LoaderConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

/// 校验 target 名称唯一性
fn validate_target_names(config: &LoaderConfig) -> Result<(), ContractError> {
    if config.load.do_load && config.targets.is_empty() {
        return Err(ContractError::config_validation(
            "targets",
            "at least one target is required when do_load is enabled",
        ));
    }

    let mut seen = HashSet::new();
    for target in &config.targets {
        if !seen.insert(&target.name) {
            return Err(ContractError::config_validation(
                format!("targets[name={}]", target.name),
                "duplicate target name",
            ));
        }
    }
    Ok(())
}

/// 校验 target 类型参数
fn validate_target_params(config: &LoaderConfig) -> Result<(), ContractError> {
    for target in &config.targets {
        let required = match target.sink_type {
            SinkType::Http => Some("url"),
            SinkType::File => Some("path"),
            SinkType::Log => None,
        };

        if let Some(key) = required {
            let present = target.params.get(key).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("targets[{}].params.{}", target.name, key),
                    format!("{:?} target requires '{}'", target.sink_type, key),
                ));
            }
        }
    }
    Ok(())
}

/// 校验 telemetry 配置
fn validate_telemetry(config: &LoaderConfig) -> Result<(), ContractError> {
    let telemetry = &config.telemetry;
    if !telemetry.enabled {
        return Ok(());
    }

    let has_host = telemetry.host.as_deref().is_some_and(|h| !h.is_empty());
    if !has_host && !telemetry.stderr {
        return Err(ContractError::config_validation(
            "telemetry.host",
            "telemetry is enabled but neither host nor stderr is configured",
        ));
    }

    if let Some(auth) = &telemetry.basic_auth {
        if !auth.contains(':') {
            return Err(ContractError::config_validation(
                "telemetry.basic_auth",
                "basic_auth must be formatted as user:password",
            ));
        }
    }

    Ok(())
}
