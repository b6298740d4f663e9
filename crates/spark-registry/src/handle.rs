//! 桥接形态的统一对象句柄。
//!
//! # 教案级导览
//! - **Why**：部分服务以“句柄类型”对外呈现（内部是引用计数的运行时对象），无法也不应按值
//!   存入泛型容器；注册表需要一个统一的“任意对象”句柄来承载它们，并在取回时执行受检下转型。
//! - **How**：[`ObjectHandle`] 包裹 `Arc<dyn Any + Send + Sync>` 并记录动态类型名；
//!   [`Bridged`] 描述“可与统一句柄互转”的能力，`from_handle` 即受检转换。
//! - **What**：句柄克隆只增加引用计数；句柄的生命周期与注册表无关，注册项被移除后已取回的
//!   句柄依然有效。

use core::{
    any::{Any, type_name},
    fmt,
};
use std::sync::Arc;

/// 统一的“任意对象”句柄。
///
/// # 教案级注释
/// - **意图 (Why)**：为 [`ServiceKind::Bridged`](crate::ServiceKind::Bridged) 注册项提供单一存储表示，
///   使注册表不必为每种句柄类型复制逻辑。
/// - **契约 (What)**
///   - [`downcast`](Self::downcast) 仅在动态类型与 `T` 完全一致时返回 `Some`；
///   - [`type_name`](Self::type_name) 返回构造句柄时的具体类型名，供错误信息使用；
///   - `Clone` 为浅拷贝，所有克隆共享同一对象。
#[derive(Clone)]
pub struct ObjectHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectHandle {
    /// 将值装箱为句柄。
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// 复用已有的 `Arc`，不产生额外分配。
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: type_name::<T>(),
        }
    }

    /// 判断动态类型是否为 `T`。
    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// 受检下转型：动态类型匹配时返回共享所有权的 `Arc<T>`。
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// 动态类型的诊断名称。
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 两个句柄是否指向同一对象。
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectHandle").field(&self.type_name).finish()
    }
}

/// “可经统一句柄存取”的能力。
///
/// # 教案级注释
/// - **意图 (Why)**：以 trait 约束在编译期选择桥接形态的注册/解析入口，替代运行时类型探测。
/// - **契约 (What)**
///   - `into_handle` 必须无损：随后对同一句柄调用 `from_handle` 应得到等价的值；
///   - `from_handle` 是受检转换，动态类型不符时返回 `None`，注册表将其报告为
///     [`RegistryError::CastFailure`](crate::RegistryError::CastFailure)；
///   - 实现类型通常是 `Arc<Inner>` 的新类型包装，可用 [`bridged_projection!`](crate::bridged_projection)
///     生成实现。
pub trait Bridged: Sized + Send + Sync + 'static {
    /// 转换为统一句柄。
    fn into_handle(self) -> ObjectHandle;

    /// 从统一句柄恢复具体类型。
    fn from_handle(handle: &ObjectHandle) -> Option<Self>;
}

impl Bridged for ObjectHandle {
    fn into_handle(self) -> ObjectHandle {
        self
    }

    fn from_handle(handle: &ObjectHandle) -> Option<Self> {
        Some(handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{Bridged, ObjectHandle};
    use std::sync::Arc;

    struct Session {
        id: u32,
    }

    #[test]
    fn downcast_checks_dynamic_type() {
        let handle = ObjectHandle::new(Session { id: 7 });
        assert!(handle.is::<Session>());
        assert!(!handle.is::<u32>());
        assert_eq!(handle.downcast::<Session>().map(|s| s.id), Some(7));
        assert!(handle.downcast::<String>().is_none(), "类型不符时必须返回 None");
        assert!(handle.type_name().ends_with("Session"));
    }

    #[test]
    fn clones_share_the_same_object() {
        let shared = Arc::new(Session { id: 1 });
        let handle = ObjectHandle::from_arc(Arc::clone(&shared));
        let copy = handle.clone();
        assert!(handle.ptr_eq(&copy));
        let recovered = copy.downcast::<Session>().expect("类型匹配");
        assert!(Arc::ptr_eq(&recovered, &shared));
    }

    #[test]
    fn object_handle_bridges_to_itself() {
        let handle = ObjectHandle::new(5_u8);
        let back = ObjectHandle::from_handle(&handle.clone().into_handle()).expect("恒等转换");
        assert!(back.ptr_eq(&handle));
    }
}
