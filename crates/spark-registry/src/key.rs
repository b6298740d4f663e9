use core::{
    any::{TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

/// 未显式命名时使用的服务名称。
pub const DEFAULT_NAME: &str = "";

/// 注册表的寻址键：编译期类型标识 + 运行时名称。
///
/// # 教案级注释
/// - **意图 (Why)**：同一类型可能需要多份注册（如 `"primary"` 与 `"secondary"`），
///   仅凭 [`TypeId`] 无法区分，因此追加名称维度。
/// - **契约 (What)**
///   - 相等性与哈希只由 `type_id` 与 `name` 决定：两者都相等时键相等；
///   - `type_name` 仅用于诊断输出，不参与比较；
///   - 名称区分大小写，空串即 [`DEFAULT_NAME`]。
/// - **执行逻辑 (How)**：`Hash` 依次写入类型标识与名称，由哈希器完成组合。
#[derive(Clone)]
pub(crate) struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
    name: String,
}

impl ServiceKey {
    /// 为类型 `T` 与名称 `name` 构造键。
    pub(crate) fn of<T: ?Sized + 'static>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: name.to_owned(),
        }
    }

    /// 类型的诊断名称，来自 [`core::any::type_name`]。
    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKey")
            .field("type", &self.type_name)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NAME, ServiceKey};
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(key: &ServiceKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn same_type_and_name_are_equal_with_equal_hash() {
        let a = ServiceKey::of::<String>("primary");
        let b = ServiceKey::of::<String>("primary");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn name_and_type_both_discriminate() {
        let base = ServiceKey::of::<String>("primary");
        assert_ne!(base, ServiceKey::of::<String>("secondary"));
        assert_ne!(base, ServiceKey::of::<u32>("primary"));
        assert_ne!(base, ServiceKey::of::<String>(DEFAULT_NAME));
    }
}
