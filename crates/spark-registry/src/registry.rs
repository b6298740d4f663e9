use core::{convert::Infallible, fmt};
use std::{collections::HashMap, sync::Arc, sync::PoisonError};

use tracing::{debug, trace, warn};

use crate::{
    config::{OverwritePolicy, RegistryConfig},
    entry::{BridgedFlavor, ErasedFactory, ErasedInstance, Flavor, NativeFlavor, ServiceEntry},
    error::{BoxError, RegistryError},
    handle::Bridged,
    key::ServiceKey,
    lifetime::{Lifetime, ServiceKind},
};

//
// 教案级说明：`loom` 模型检查需要接管互斥锁以枚举调度交错，因此在 `--cfg loom`
// （或 `--cfg spark_loom`）下切换到 `loom::sync::Mutex`；常规构建使用标准库互斥锁。
#[cfg(any(loom, spark_loom))]
use loom::sync::{Mutex, MutexGuard};
#[cfg(not(any(loom, spark_loom)))]
use std::sync::{Mutex, MutexGuard};

type EntryMap = HashMap<ServiceKey, Arc<ServiceEntry>>;

/// 注册项的只读描述，用于启动诊断输出。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationInfo {
    /// 注册键的类型名。
    pub type_name: &'static str,
    /// 注册键的服务名。
    pub name: String,
    pub kind: ServiceKind,
    pub lifetime: Lifetime,
}

/// `ServiceRegistry` 按 `(类型, 名称)` 存取服务，支持单例/瞬态两种生命周期与原生/桥接两种形态。
///
/// # 教案级注释
/// - **目标 (Why)**
///   - 启动代码集中登记服务，业务代码按类型与名称取回，彼此无需知道对方的构造细节；
///   - 同一类型可用不同名称登记多份，互不干扰。
/// - **架构位置 (Where)**
///   - 叶子组件：由应用入口显式构造并持有，按引用或 `Arc` 传递给需要延迟/解耦构造的组件；
///     本 crate 不提供全局实例。
/// - **设计要点 (How)**
///   - 一把粗粒度互斥锁保护整张映射，只覆盖查找、插入、删除、清空本身；
///   - 注册项以 `Arc` 共享：解析线程先在锁内克隆句柄、随即释放锁，再在锁外执行构造逻辑；
///   - 原生与桥接两类入口通过 trait 约束在编译期选择，内部共用同一套查找与构造流程。
/// - **契约 (What)**
///   - 每个键至多一个注册项；按 [`OverwritePolicy`] 决定重复注册是替换还是拒绝；
///   - 单例在注册调用内构造，构造失败（含 panic）时该键保持原状；
///   - 瞬态工厂在每次解析时于调用线程执行，同一注册项的并发解析不会被串行化；
///   - 移除或清空不影响已经交给调用方的实例。
/// - **风险与注意事项 (Trade-offs)**
///   - 构造器与工厂永远不会在持锁状态下执行，因此在工厂内部回调同一注册表是安全的；
///   - 被替换或移除的注册项同样在锁外释放，实例的 `Drop` 可以安全访问注册表；
///   - 替换不会主动“释放”旧实例的资源，旧实例在最后一个持有者放手时才析构。
pub struct ServiceRegistry {
    config: RegistryConfig,
    entries: Mutex<EntryMap>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    /// 以默认配置创建空注册表。
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// 以给定配置创建空注册表。
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// 以 `T::default()` 构造原生服务。
    ///
    /// - `Singleton`：立即构造并存储；
    /// - `Transient`：存储调用 `T::default()` 的工厂，每次解析都构造新实例。
    pub fn register_instance<T>(&self, lifetime: Lifetime, name: &str) -> Result<(), RegistryError>
    where
        T: Default + Send + Sync + 'static,
    {
        self.register_factory::<T, _>(T::default, lifetime, name)
    }

    /// 以不会失败的工厂注册原生服务。
    pub fn register_factory<T, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
        name: &str,
    ) -> Result<(), RegistryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.try_register_factory::<T, Infallible, _>(move || Ok(factory()), lifetime, name)
    }

    /// 以可能失败的工厂注册原生服务。
    ///
    /// # 教案级注释
    /// - **输入参数**
    ///   - `factory`：零参数工厂，返回 `Result<T, E>`；错误类型只需能转换为 [`BoxError`]；
    ///   - `lifetime`：决定工厂在注册时执行一次，还是每次解析时执行；
    ///   - `name`：服务名，空串表示默认注册。
    /// - **执行逻辑 (How)**
    ///   1. 将工厂擦除为统一签名；
    ///   2. 单例在加锁之前执行一次工厂，失败则返回 [`RegistryError::ConstructionFailure`]，映射保持原状；
    ///   3. 加锁，按覆盖策略写入注册项。
    /// - **返回值 (What)**
    ///   - 成功返回 `()`；
    ///   - 单例构造失败返回 `ConstructionFailure`；
    ///   - `Reject` 策略下键已存在返回 [`RegistryError::AlreadyRegistered`]。
    pub fn try_register_factory<T, E, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
        name: &str,
    ) -> Result<(), RegistryError>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let erased: ErasedFactory = Arc::new(move || -> Result<ErasedInstance, BoxError> {
            factory().map(ErasedInstance::native).map_err(Into::into)
        });
        self.insert(ServiceKey::of::<T>(name), ServiceKind::Native, lifetime, erased)
    }

    /// 以 `T::default()` 构造桥接服务。
    pub fn register_bridged<T>(&self, lifetime: Lifetime, name: &str) -> Result<(), RegistryError>
    where
        T: Bridged + Default,
    {
        self.register_bridged_factory::<T, T, _>(T::default, lifetime, name)
    }

    /// 以不会失败的工厂注册桥接服务。
    ///
    /// 键类型为 `T`，工厂可以产出任意桥接值 `H`；解析时再经 [`Bridged::from_handle`] 转换为 `T`，
    /// 动态类型不符时报告 [`RegistryError::CastFailure`]。
    pub fn register_bridged_factory<T, H, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
        name: &str,
    ) -> Result<(), RegistryError>
    where
        T: Bridged,
        H: Bridged,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.try_register_bridged_factory::<T, H, Infallible, _>(
            move || Ok(factory()),
            lifetime,
            name,
        )
    }

    /// 以可能失败的工厂注册桥接服务，错误语义同 [`try_register_factory`](Self::try_register_factory)。
    pub fn try_register_bridged_factory<T, H, E, F>(
        &self,
        factory: F,
        lifetime: Lifetime,
        name: &str,
    ) -> Result<(), RegistryError>
    where
        T: Bridged,
        H: Bridged,
        E: Into<BoxError> + 'static,
        F: Fn() -> Result<H, E> + Send + Sync + 'static,
    {
        let erased: ErasedFactory = Arc::new(move || -> Result<ErasedInstance, BoxError> {
            factory().map(ErasedInstance::bridged).map_err(Into::into)
        });
        self.insert(ServiceKey::of::<T>(name), ServiceKind::Bridged, lifetime, erased)
    }

    /// 解析原生服务。
    ///
    /// # 教案级注释
    /// - **执行逻辑 (How)**
    ///   1. 加锁查找注册项，克隆其 `Arc` 后立即释放锁；
    ///   2. 未命中返回 [`RegistryError::NotRegistered`]；
    ///   3. 注册项为桥接形态返回 [`RegistryError::KindMismatch`]；
    ///   4. 单例直接返回共享实例；瞬态在锁外执行工厂，返回错误或 panic 时均报告
    ///      [`RegistryError::ConstructionFailure`]。
    /// - **返回值 (What)**：`Arc<T>`，调用方与注册表共同持有（单例）或独占（瞬态）。
    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        self.resolve_with::<NativeFlavor<T>>(ServiceKey::of::<T>(name))
    }

    /// 同 [`resolve`](Self::resolve)，但把所有失败都折叠为 `None`；瞬态工厂 panic 同样得到 `None`。
    pub fn try_resolve<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve::<T>(name).ok()
    }

    /// 解析桥接服务，失败路径同 [`resolve`](Self::resolve)，另有动态类型不符时的
    /// [`RegistryError::CastFailure`]。
    pub fn resolve_bridged<T>(&self, name: &str) -> Result<T, RegistryError>
    where
        T: Bridged,
    {
        self.resolve_with::<BridgedFlavor<T>>(ServiceKey::of::<T>(name))
    }

    pub fn try_resolve_bridged<T>(&self, name: &str) -> Option<T>
    where
        T: Bridged,
    {
        self.resolve_bridged::<T>(name).ok()
    }

    /// 移除 `(T, name)` 的注册项，返回此前是否存在。
    ///
    /// 已解析出的实例不受影响。
    pub fn remove<T: ?Sized + 'static>(&self, name: &str) -> bool {
        let key = ServiceKey::of::<T>(name);
        let removed = self.lock().remove(&key);
        debug!(
            service = key.type_name(),
            name = key.name(),
            removed = removed.is_some(),
            "service registration removed"
        );
        removed.is_some()
    }

    /// 清空全部注册项。
    pub fn clear(&self) {
        let dropped = core::mem::take(&mut *self.lock());
        debug!(dropped = dropped.len(), "service registry cleared");
    }

    /// 是否存在 `(T, name)` 的注册项；不会触发构造。
    pub fn contains<T: ?Sized + 'static>(&self, name: &str) -> bool {
        self.lock().contains_key(&ServiceKey::of::<T>(name))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 返回当前注册项快照，按 `(类型名, 服务名)` 排序，便于生成稳定的诊断输出。
    pub fn registrations(&self) -> Vec<RegistrationInfo> {
        let mut infos: Vec<RegistrationInfo> = self
            .lock()
            .iter()
            .map(|(key, entry)| RegistrationInfo {
                type_name: key.type_name(),
                name: key.name().to_owned(),
                kind: entry.kind(),
                lifetime: entry.lifetime(),
            })
            .collect();
        infos.sort_by(|a, b| (a.type_name, &a.name).cmp(&(b.type_name, &b.name)));
        infos
    }

    fn lock(&self) -> MutexGuard<'_, EntryMap> {
        // 用户代码从不在锁内执行，中毒只可能来自本模块自身的 panic；此时映射仍然一致，直接取回。
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &ServiceKey) -> Option<Arc<ServiceEntry>> {
        self.lock().get(key).cloned()
    }

    fn insert(
        &self,
        key: ServiceKey,
        kind: ServiceKind,
        lifetime: Lifetime,
        factory: ErasedFactory,
    ) -> Result<(), RegistryError> {
        let reject = self.config.overwrite == OverwritePolicy::Reject;
        if reject && self.contains_key(&key) {
            return Err(already_registered(&key));
        }

        let entry = ServiceEntry::build(kind, lifetime, factory).map_err(|source| {
            RegistryError::ConstructionFailure {
                service: key.type_name(),
                name: key.name().to_owned(),
                source,
            }
        })?;
        let entry = Arc::new(entry);

        let previous = {
            let mut entries = self.lock();
            // 构造期间可能有其他线程抢先注册，拒绝策略需在锁内复核。
            if reject && entries.contains_key(&key) {
                return Err(already_registered(&key));
            }
            entries.insert(key.clone(), entry)
        };

        debug!(
            service = key.type_name(),
            name = key.name(),
            kind = %kind,
            lifetime = %lifetime,
            replaced = previous.is_some(),
            "service registered"
        );
        if let Some(previous) = &previous
            && (previous.kind() != kind || previous.lifetime() != lifetime)
        {
            warn!(
                service = key.type_name(),
                name = key.name(),
                previous_kind = %previous.kind(),
                previous_lifetime = %previous.lifetime(),
                kind = %kind,
                lifetime = %lifetime,
                "registration replaced an entry of a different shape"
            );
        }
        Ok(())
    }

    fn contains_key(&self, key: &ServiceKey) -> bool {
        self.lock().contains_key(key)
    }

    fn resolve_with<F: Flavor>(&self, key: ServiceKey) -> Result<F::Output, RegistryError> {
        let result = self.lookup(&key).map_or_else(
            || {
                Err(RegistryError::NotRegistered {
                    service: key.type_name(),
                    name: key.name().to_owned(),
                })
            },
            |entry| Self::materialize::<F>(&key, &entry),
        );
        if self.config.trace_resolutions {
            match &result {
                Ok(_) => trace!(service = key.type_name(), name = key.name(), "service resolved"),
                Err(err) => trace!(
                    service = key.type_name(),
                    name = key.name(),
                    code = err.code(),
                    "service resolution failed"
                ),
            }
        }
        result
    }

    fn materialize<F: Flavor>(
        key: &ServiceKey,
        entry: &ServiceEntry,
    ) -> Result<F::Output, RegistryError> {
        if entry.kind() != F::KIND {
            return Err(RegistryError::KindMismatch {
                service: key.type_name(),
                name: key.name().to_owned(),
                expected: F::KIND,
                actual: entry.kind(),
            });
        }
        let instance = entry
            .instantiate()
            .map_err(|source| RegistryError::ConstructionFailure {
                service: key.type_name(),
                name: key.name().to_owned(),
                source,
            })?;
        F::recover(instance).map_err(|actual| RegistryError::CastFailure {
            service: key.type_name(),
            name: key.name().to_owned(),
            actual,
        })
    }
}

fn already_registered(key: &ServiceKey) -> RegistryError {
    RegistryError::AlreadyRegistered {
        service: key.type_name(),
        name: key.name().to_owned(),
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}
