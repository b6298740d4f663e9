//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义注册表对外暴露的错误语义，调用方可以区分“没有注册项”“注册项形态不符”
//!   “动态类型不符”“用户构造逻辑失败”四类故障，而不是只拿到一段字符串；
//! - 每个变体都携带被请求的类型名与服务名，足以在日志中直接定位问题注册点。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，与 `std::error::Error` 生态兼容；
//! - [`RegistryError::code`] 返回稳定错误码，遵循 `<领域>.<语义>` 命名约定。

use core::any::Any;

use thiserror::Error;

use crate::lifetime::ServiceKind;

/// 用户构造器/工厂返回的错误的擦除形式。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 注册表内置错误码。
pub mod codes {
    /// 请求的 `(类型, 名称)` 没有注册项。
    pub const NOT_REGISTERED: &str = "registry.not_registered";
    /// 注册项存在，但存储形态与请求入口不符。
    pub const KIND_MISMATCH: &str = "registry.kind_mismatch";
    /// 桥接注册项的动态类型无法转换为请求类型。
    pub const CAST_FAILURE: &str = "registry.cast_failure";
    /// 用户提供的构造逻辑返回错误。
    pub const CONSTRUCTION_FAILURE: &str = "registry.construction_failure";
    /// 在 `OverwritePolicy::Reject` 下重复注册。
    pub const ALREADY_REGISTERED: &str = "registry.already_registered";
}

/// 注册表错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：`resolve` 系列入口把所有失败路径以结构化错误同步返回；
///   `try_resolve` 系列则在本地吞掉这些错误，只报告“无结果”。
/// - **契约 (What)**
///   - `service` 为请求类型的 [`core::any::type_name`]，`name` 为请求的服务名（可为空串）；
///   - [`RegistryError::ConstructionFailure`] 通过 `#[source]` 保留用户错误链；
///   - 单例在注册阶段构造失败时同样返回 `ConstructionFailure`，且注册表对该键保持原状。
/// - **风险 (Trade-offs)**：名称以 `String` 保存，错误路径上会产生一次分配，换取可读的诊断信息。
#[derive(Debug, Error)]
pub enum RegistryError {
    /// 没有与 `(类型, 名称)` 对应的注册项。
    #[error("service `{service}`{} is not registered", display_name(.name))]
    NotRegistered {
        service: &'static str,
        name: String,
    },

    /// 注册项存在，但以另一种存储形态登记。
    ///
    /// 例如以原生入口解析一个经桥接入口注册的类型。
    #[error(
        "service `{service}`{} is registered as {actual}, but was requested as {expected}",
        display_name(.name)
    )]
    KindMismatch {
        service: &'static str,
        name: String,
        expected: ServiceKind,
        actual: ServiceKind,
    },

    /// 桥接注册项的动态类型与请求类型不符。
    #[error(
        "service `{service}`{} holds an object of type `{actual}` that cannot be cast to the requested type",
        display_name(.name)
    )]
    CastFailure {
        service: &'static str,
        name: String,
        actual: &'static str,
    },

    /// 用户构造器或工厂返回错误。
    #[error("failed to construct service `{service}`{}: {source}", display_name(.name))]
    ConstructionFailure {
        service: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },

    /// 覆盖策略为拒绝时，键已被占用。
    #[error("service `{service}`{} is already registered", display_name(.name))]
    AlreadyRegistered {
        service: &'static str,
        name: String,
    },
}

impl RegistryError {
    /// 返回稳定错误码，见 [`codes`]。
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NotRegistered { .. } => codes::NOT_REGISTERED,
            RegistryError::KindMismatch { .. } => codes::KIND_MISMATCH,
            RegistryError::CastFailure { .. } => codes::CAST_FAILURE,
            RegistryError::ConstructionFailure { .. } => codes::CONSTRUCTION_FAILURE,
            RegistryError::AlreadyRegistered { .. } => codes::ALREADY_REGISTERED,
        }
    }

    /// 被请求的类型名。
    pub fn service(&self) -> &'static str {
        match self {
            RegistryError::NotRegistered { service, .. }
            | RegistryError::KindMismatch { service, .. }
            | RegistryError::CastFailure { service, .. }
            | RegistryError::ConstructionFailure { service, .. }
            | RegistryError::AlreadyRegistered { service, .. } => *service,
        }
    }

    /// 被请求的服务名。
    pub fn name(&self) -> &str {
        match self {
            RegistryError::NotRegistered { name, .. }
            | RegistryError::KindMismatch { name, .. }
            | RegistryError::CastFailure { name, .. }
            | RegistryError::ConstructionFailure { name, .. }
            | RegistryError::AlreadyRegistered { name, .. } => name,
        }
    }
}

/// 用户构造逻辑 panic 时的错误形式，作为 [`RegistryError::ConstructionFailure`] 的错误源。
///
/// # 教案级注释
/// - **意图 (Why)**：`register_instance`/`register_bridged` 依赖 `Default`，没有错误通道，
///   构造失败只能表现为 panic；注册表把它收敛为普通的构造失败，`try_resolve` 因而不会向调用方抛出 panic。
/// - **契约 (What)**：`message` 取自 panic 载荷（`&str` 或 `String`），其他载荷类型记为占位文本。
#[derive(Debug, Error)]
#[error("constructor panicked: {message}")]
pub struct ConstructorPanic {
    message: String,
}

impl ConstructorPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "<unknown panic payload>".to_owned()
        };
        Self { message }
    }

    /// panic 载荷中的文本。
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("@{name}")
    }
}
