//! 注册表运行参数。
//!
//! # 教案级导览
//! - **Why**：同一份注册表实现需要兼容两类宿主：沿用“后注册者覆盖”语义的应用，以及希望
//!   在重复注册时尽早失败的宿主；同时允许在排障时打开逐次解析的追踪日志。
//! - **How**：[`RegistryConfig`] 派生 `serde::Deserialize` 且所有字段带默认值，可从 TOML 片段加载，
//!   也可在代码中直接构造。
//! - **What**：配置只影响注册冲突处理与日志详略，不参与服务装配；注册表不会根据配置文件自动注册服务。

use serde::Deserialize;
use thiserror::Error;

/// 注册键冲突时的处理策略。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// 新注册整体替换旧注册项；旧实例不会被主动释放，已被调用方持有的实例继续有效。
    #[default]
    Replace,
    /// 键已存在时返回 [`RegistryError::AlreadyRegistered`](crate::RegistryError::AlreadyRegistered)，
    /// 保留旧注册项。
    Reject,
}

/// 注册表配置。
///
/// ```
/// use spark_registry::{OverwritePolicy, RegistryConfig};
///
/// let config = RegistryConfig::from_toml_str(
///     r#"
///     overwrite = "reject"
///     trace_resolutions = true
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.overwrite, OverwritePolicy::Reject);
/// assert!(config.trace_resolutions);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// 重复注册同一键时的策略，默认 [`OverwritePolicy::Replace`]。
    pub overwrite: OverwritePolicy,
    /// 是否为每次解析输出 `TRACE` 级日志。
    pub trace_resolutions: bool,
}

impl RegistryConfig {
    /// 从 TOML 文本解析配置，缺省字段取默认值。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(ConfigError::Parse)
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_trace_resolutions(mut self, enabled: bool) -> Self {
        self.trace_resolutions = enabled;
        self
    }
}

/// 配置加载错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 语法错误或字段取值非法。
    #[error("invalid registry configuration: {0}")]
    Parse(#[source] toml::de::Error),
}
