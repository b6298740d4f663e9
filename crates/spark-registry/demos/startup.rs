//! 启动装配演示。
//!
//! # 教案级导览
//! - **Why**：展示注册表在宿主中的正确位置：入口函数显式构造并持有，按引用传给装配与业务代码。
//! - **How**：登记一个原生配置单例、两份数据上下文（单例 `Default` 与瞬态 `ForNT`），
//!   随后模拟业务代码解析它们，并打印注册快照。
//! - **运行方式**：`RUST_LOG=spark_registry=debug cargo run -p spark-registry --example startup`。

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use anyhow::{Context, Result};
use spark_registry::{DEFAULT_NAME, Lifetime, RegistryConfig, ServiceRegistry, bridged_projection};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 由宿主配置文件提供的注册表参数。
const REGISTRY_TOML: &str = r#"
overwrite = "reject"
trace_resolutions = true
"#;

#[derive(Debug)]
struct HostSettings {
    endpoint: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            endpoint: "tcp://127.0.0.1:7400".to_owned(),
        }
    }
}

/// 远端查询会话的运行时对象。
struct QuerySession {
    id: u64,
}

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

impl Default for QuerySession {
    fn default() -> Self {
        Self {
            id: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// 对外暴露的数据上下文句柄。
#[derive(Clone)]
struct DataContext(Arc<QuerySession>);

impl Default for DataContext {
    fn default() -> Self {
        Self(Arc::new(QuerySession::default()))
    }
}

bridged_projection!(DataContext => QuerySession);

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 启动阶段：集中登记全部服务。
fn register_services(registry: &ServiceRegistry) -> Result<()> {
    registry
        .register_instance::<HostSettings>(Lifetime::Singleton, DEFAULT_NAME)
        .context("register host settings")?;
    registry
        .register_bridged::<DataContext>(Lifetime::Singleton, "Default")
        .context("register default data context")?;
    registry
        .register_bridged::<DataContext>(Lifetime::Transient, "ForNT")
        .context("register per-call data context")?;
    Ok(())
}

/// 业务阶段：只依赖注册表，不关心构造细节。
fn serve(registry: &ServiceRegistry) -> Result<()> {
    let settings = registry.resolve::<HostSettings>(DEFAULT_NAME)?;
    let shared = registry.resolve_bridged::<DataContext>("Default")?;
    let again = registry.resolve_bridged::<DataContext>("Default")?;
    let fresh = registry.resolve_bridged::<DataContext>("ForNT")?;

    info!(
        endpoint = %settings.endpoint,
        shared_session = shared.0.id,
        shared_is_stable = Arc::ptr_eq(&shared.0, &again.0),
        fresh_session = fresh.0.id,
        "services resolved"
    );
    Ok(())
}

fn main() -> Result<()> {
    install_tracing();

    let config = RegistryConfig::from_toml_str(REGISTRY_TOML)?;
    let registry = ServiceRegistry::with_config(config);

    register_services(&registry)?;
    if let Err(err) = registry.register_instance::<HostSettings>(Lifetime::Singleton, DEFAULT_NAME) {
        info!(code = err.code(), "duplicate registration rejected: {err}");
    }

    serve(&registry)?;

    for info in registry.registrations() {
        println!(
            "{:<48} name={:<8} kind={:<8} lifetime={}",
            info.type_name,
            format!("{:?}", info.name),
            info.kind.as_str(),
            info.lifetime.as_str()
        );
    }
    Ok(())
}
