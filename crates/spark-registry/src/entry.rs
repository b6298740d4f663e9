//! 注册项的擦除存储与两种形态的恢复策略。

use core::{
    any::{Any, type_name},
    marker::PhantomData,
};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use crate::{
    error::{BoxError, ConstructorPanic},
    handle::{Bridged, ObjectHandle},
    lifetime::{Lifetime, ServiceKind},
};

/// 类型擦除后的零参数工厂。
pub(crate) type ErasedFactory =
    Arc<dyn Fn() -> Result<ErasedInstance, BoxError> + Send + Sync + 'static>;

/// 类型擦除后的实例：原生对象或统一句柄。
#[derive(Clone)]
pub(crate) enum ErasedInstance {
    Native {
        value: Arc<dyn Any + Send + Sync>,
        type_name: &'static str,
    },
    Bridged(ObjectHandle),
}

impl ErasedInstance {
    pub(crate) fn native<T: Send + Sync + 'static>(value: T) -> Self {
        ErasedInstance::Native {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn bridged<H: Bridged>(value: H) -> Self {
        ErasedInstance::Bridged(value.into_handle())
    }

    fn type_name(&self) -> &'static str {
        match self {
            ErasedInstance::Native { type_name, .. } => *type_name,
            ErasedInstance::Bridged(handle) => handle.type_name(),
        }
    }
}

/// 执行擦除工厂；工厂 panic 时捕获载荷并转为 [`ConstructorPanic`] 错误。
fn invoke(factory: &ErasedFactory) -> Result<ErasedInstance, BoxError> {
    panic::catch_unwind(AssertUnwindSafe(|| factory()))
        .unwrap_or_else(|payload| Err(ConstructorPanic::from_payload(payload).into()))
}

/// 注册项的存储：单例持有实例，瞬态持有工厂；创建后不再切换。
enum Storage {
    Instance(ErasedInstance),
    Factory(ErasedFactory),
}

/// 单个键对应的注册项。
///
/// # 教案级注释
/// - **意图 (Why)**：把“形态 + 生命周期 + 存储”封装为不可变对象，注册表只需以 `Arc` 共享，
///   解析线程在释放映射锁之后仍可安全使用。
/// - **契约 (What)**
///   - 单例注册项在 [`ServiceEntry::build`] 内部完成构造，构造失败则不产生注册项；
///   - 瞬态注册项的工厂在每次 [`ServiceEntry::instantiate`] 时执行，调用方负责保证此时未持有任何锁；
///   - 注册项本身不可变，多线程可并发调用 `instantiate`。
pub(crate) struct ServiceEntry {
    kind: ServiceKind,
    lifetime: Lifetime,
    storage: Storage,
}

impl ServiceEntry {
    /// 按生命周期构建注册项；单例会立即执行一次工厂。
    pub(crate) fn build(
        kind: ServiceKind,
        lifetime: Lifetime,
        factory: ErasedFactory,
    ) -> Result<Self, BoxError> {
        let storage = match lifetime {
            Lifetime::Singleton => Storage::Instance(invoke(&factory)?),
            Lifetime::Transient => Storage::Factory(factory),
        };
        Ok(Self {
            kind,
            lifetime,
            storage,
        })
    }

    pub(crate) fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub(crate) fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 取出实例：单例返回共享副本，瞬态执行工厂（工厂 panic 同样以错误返回）。
    pub(crate) fn instantiate(&self) -> Result<ErasedInstance, BoxError> {
        match &self.storage {
            Storage::Instance(instance) => Ok(instance.clone()),
            Storage::Factory(factory) => invoke(factory),
        }
    }
}

/// 形态策略：描述某一解析入口期望的形态，以及如何从擦除实例恢复结果。
///
/// 原生与桥接两类入口共享同一套查找/构造流程，差异只落在这里。
pub(crate) trait Flavor {
    type Output;

    const KIND: ServiceKind;

    /// 从擦除实例恢复结果；失败时返回实例的动态类型名。
    fn recover(instance: ErasedInstance) -> Result<Self::Output, &'static str>;
}

pub(crate) struct NativeFlavor<T>(PhantomData<fn() -> T>);

impl<T: Send + Sync + 'static> Flavor for NativeFlavor<T> {
    type Output = Arc<T>;

    const KIND: ServiceKind = ServiceKind::Native;

    fn recover(instance: ErasedInstance) -> Result<Arc<T>, &'static str> {
        let actual = instance.type_name();
        match instance {
            ErasedInstance::Native { value, .. } => value.downcast::<T>().map_err(|_| actual),
            ErasedInstance::Bridged(_) => Err(actual),
        }
    }
}

pub(crate) struct BridgedFlavor<T>(PhantomData<fn() -> T>);

impl<T: Bridged> Flavor for BridgedFlavor<T> {
    type Output = T;

    const KIND: ServiceKind = ServiceKind::Bridged;

    fn recover(instance: ErasedInstance) -> Result<T, &'static str> {
        match &instance {
            ErasedInstance::Bridged(handle) => T::from_handle(handle).ok_or(handle.type_name()),
            ErasedInstance::Native { type_name, .. } => Err(*type_name),
        }
    }
}
