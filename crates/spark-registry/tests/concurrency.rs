//! 注册表并发行为测试。
//!
//! # 教案级导览
//!
//! - **Why**：注册表会被启动线程与任意业务线程同时访问；映射锁一旦覆盖到用户构造逻辑，
//!   就会出现串行化甚至死锁；引用计数若处理不当，移除与解析的竞态会访问已释放的注册项。
//! - **How**：以真实线程 + `Barrier` 对齐起跑点，制造最大程度的交错。
//! - **What**：断言无死锁（测试能结束）、无数据错乱（每个线程读到自己写入的值），
//!   以及瞬态并发解析得到互相独立的实例。

#![cfg(not(any(loom, spark_loom)))]

use std::{
    collections::HashSet,
    sync::{
        Arc, Barrier,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use spark_registry::{DEFAULT_NAME, Lifetime, RegistryError, ServiceRegistry};

struct Tagged {
    owner: usize,
    round: usize,
}

#[test]
fn distinct_keys_from_many_threads_do_not_interfere() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    let registry = Arc::new(ServiceRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|owner| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = format!("worker-{owner}");
                barrier.wait();
                for round in 0..ROUNDS {
                    registry
                        .register_factory(
                            move || Tagged { owner, round },
                            Lifetime::Singleton,
                            &name,
                        )
                        .expect("注册不会失败");
                    let tagged = registry.resolve::<Tagged>(&name).expect("自己的键必须可解析");
                    assert_eq!((tagged.owner, tagged.round), (owner, round), "读到了其他线程的数据");
                    assert!(registry.remove::<Tagged>(&name));
                    assert!(registry.try_resolve::<Tagged>(&name).is_none());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("工作线程不应 panic");
    }
    assert!(registry.is_empty());
}

#[test]
fn concurrent_transient_resolves_build_independent_instances() {
    const THREADS: usize = 8;

    let registry = Arc::new(ServiceRegistry::new());
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    registry
        .register_factory(
            move || Tagged {
                owner: counter.fetch_add(1, Ordering::SeqCst),
                round: 0,
            },
            Lifetime::Transient,
            DEFAULT_NAME,
        )
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.resolve::<Tagged>(DEFAULT_NAME).unwrap().owner
            })
        })
        .collect();

    let ids: HashSet<usize> = workers
        .into_iter()
        .map(|worker| worker.join().expect("解析线程不应 panic"))
        .collect();
    assert_eq!(ids.len(), THREADS, "每个线程都应得到独立构造的实例");
    assert_eq!(built.load(Ordering::SeqCst), THREADS);
}

/// 瞬态工厂在锁外执行：一个阻塞中的工厂不得阻止其他线程访问注册表。
#[test]
fn slow_factory_does_not_hold_the_map_lock() {
    let registry = Arc::new(ServiceRegistry::new());
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let entered_tx = std::sync::Mutex::new(entered_tx);
    let release_rx = std::sync::Mutex::new(release_rx);

    registry
        .register_factory(
            move || {
                let _ = entered_tx.lock().map(|tx| tx.send(()));
                let _ = release_rx.lock().map(|rx| rx.recv());
                Tagged { owner: 0, round: 0 }
            },
            Lifetime::Transient,
            "slow",
        )
        .unwrap();

    let slow = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.resolve::<Tagged>("slow").is_ok())
    };

    entered_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("工厂应已开始执行");

    // 工厂仍在阻塞，此时映射上的所有操作都必须立即完成。
    registry.register_factory(|| 7_u8, Lifetime::Singleton, DEFAULT_NAME).unwrap();
    assert_eq!(*registry.resolve::<u8>(DEFAULT_NAME).unwrap(), 7);
    assert!(registry.remove::<u8>(DEFAULT_NAME));
    assert_eq!(registry.len(), 1);

    release_tx.send(()).unwrap();
    assert!(slow.join().expect("慢速解析线程不应 panic"));
}

/// 移除与解析竞态：解析线程要么拿到完整实例，要么得到 `NotRegistered`，不存在第三种结果。
#[test]
fn remove_racing_resolve_yields_instance_or_not_registered() {
    const ROUNDS: usize = 500;

    let registry = Arc::new(ServiceRegistry::new());
    for round in 0..ROUNDS {
        registry
            .register_factory(move || Tagged { owner: 1, round }, Lifetime::Transient, "race")
            .unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let resolver = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.resolve::<Tagged>("race")
            })
        };
        let remover = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.remove::<Tagged>("race")
            })
        };

        assert!(remover.join().expect("移除线程不应 panic"));
        match resolver.join().expect("解析线程不应 panic") {
            Ok(tagged) => assert_eq!(tagged.round, round),
            Err(RegistryError::NotRegistered { .. }) => {}
            Err(other) => panic!("非预期错误：{other}"),
        }
    }
}

#[test]
fn clear_racing_registrations_never_deadlocks() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 250;

    let registry = Arc::new(ServiceRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let writers: Vec<_> = (0..THREADS)
        .map(|owner| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = format!("w{owner}");
                barrier.wait();
                for round in 0..ROUNDS {
                    registry
                        .register_factory(move || round, Lifetime::Singleton, &name)
                        .unwrap();
                    if let Some(value) = registry.try_resolve::<usize>(&name) {
                        assert!(*value <= round, "不得读到未来写入的值");
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    for _ in 0..ROUNDS {
        registry.clear();
    }
    for writer in writers {
        writer.join().expect("写线程不应 panic");
    }
    assert!(registry.len() <= THREADS);
}
