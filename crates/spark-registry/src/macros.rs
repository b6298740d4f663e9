/// 为 `Arc<Inner>` 的新类型包装（“投影”类型）生成 [`Bridged`](crate::Bridged) 实现。
///
/// # 教案级注释
/// - **意图 (Why)**：桥接形态的服务多为“句柄包装”，手写 `into_handle`/`from_handle` 全是样板代码。
/// - **契约 (What)**
///   - 目标类型必须是单字段元组结构体，字段类型为 `Arc<Inner>` 且在调用点可见；
///   - `from_handle` 仅在句柄动态类型恰为 `Inner` 时成功，否则返回 `None`。
///
/// ```
/// use std::sync::Arc;
/// use spark_registry::{Bridged, ObjectHandle, bridged_projection};
///
/// struct ContextImpl;
/// #[derive(Clone)]
/// struct DataContext(Arc<ContextImpl>);
/// bridged_projection!(DataContext => ContextImpl);
///
/// let handle = DataContext(Arc::new(ContextImpl)).into_handle();
/// assert!(DataContext::from_handle(&handle).is_some());
/// assert!(DataContext::from_handle(&ObjectHandle::new(1_u8)).is_none());
/// ```
#[macro_export]
macro_rules! bridged_projection {
    ($($projection:ty => $inner:ty),+ $(,)?) => {
        $(
            impl $crate::Bridged for $projection {
                fn into_handle(self) -> $crate::ObjectHandle {
                    $crate::ObjectHandle::from_arc(self.0)
                }

                fn from_handle(handle: &$crate::ObjectHandle) -> ::core::option::Option<Self> {
                    handle.downcast::<$inner>().map(Self)
                }
            }
        )+
    };
}
