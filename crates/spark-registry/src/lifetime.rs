use core::fmt;

/// 服务生命周期策略。
///
/// # 教案级注释
/// - **意图 (Why)**：区分“注册时构造一次、之后反复复用”与“每次解析都构造新实例”两种语义，
///   让调用方在注册点声明意图，而非在每个解析点自行缓存。
/// - **契约 (What)**
///   - [`Lifetime::Singleton`]：注册调用内部立即构造实例并存储；后续解析返回同一实例；
///   - [`Lifetime::Transient`]：注册时只保存工厂；每次解析都在调用线程上执行一次工厂。
/// - **风险提示 (Trade-offs)**：单例的构造失败在注册时暴露，瞬态的构造失败延迟到解析时暴露。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// 注册时构造一次，之后每次解析返回同一实例。
    Singleton,
    /// 每次解析都通过工厂构造全新实例。
    Transient,
}

impl Lifetime {
    /// 稳定的文本标签，用于日志字段与诊断输出。
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册项的存储形态。
///
/// - `Native`：以 `Arc<dyn Any + Send + Sync>` 保存的普通对象，解析时返回 `Arc<T>`；
/// - `Bridged`：以 [`ObjectHandle`](crate::ObjectHandle) 保存，解析时经由
///   [`Bridged::from_handle`](crate::Bridged::from_handle) 执行受检下转型。
///
/// 形态由注册入口在编译期决定，解析入口与形态不符时返回
/// [`RegistryError::KindMismatch`](crate::RegistryError::KindMismatch)。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Native,
    Bridged,
}

impl ServiceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Native => "native",
            ServiceKind::Bridged => "bridged",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
