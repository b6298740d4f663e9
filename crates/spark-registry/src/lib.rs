#![deny(unsafe_code)]
#![doc = "spark-registry: 线程安全、按“类型 + 名称”寻址的服务注册表。"]
#![doc = ""]
#![doc = "== 定位 =="]
#![doc = "宿主启动阶段集中登记服务（立即构造的单例、按需构造的瞬态实例或自定义工厂），"]
#![doc = "随后由任意线程按相同的 `(类型, 名称)` 取回实例或现场构造新实例。"]
#![doc = ""]
#![doc = "== 两种存储形态 =="]
#![doc = "- `Native`：普通的自有对象，以 `Arc<T>` 共享所有权返回；"]
#![doc = "- `Bridged`：经由统一对象句柄 [`ObjectHandle`] 存取，取回时执行受检的运行时下转型。"]
#![doc = ""]
#![doc = "注册表不提供进程级全局实例：由应用入口显式构造并按引用传递。"]

pub mod config;
pub mod error;
mod entry;
pub mod handle;
mod key;
mod lifetime;
mod macros;
mod registry;

pub use config::{ConfigError, OverwritePolicy, RegistryConfig};
pub use error::{BoxError, ConstructorPanic, RegistryError, codes};
pub use handle::{Bridged, ObjectHandle};
pub use key::DEFAULT_NAME;
pub use lifetime::{Lifetime, ServiceKind};
pub use registry::{RegistrationInfo, ServiceRegistry};
