use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use taskgate::{
    ConfigError, EventKind, Limiter, LimiterConfig, LimiterStats, Subscribe, TaskError,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

mod support;
use support::{ms_since, sleep_ms};

/// Built-in log subscriber when the `logging` feature is on, nothing otherwise.
fn log_subscribers() -> Vec<Arc<dyn Subscribe>> {
    #[cfg(feature = "logging")]
    return vec![Arc::new(taskgate::LogWriter::new())];
    #[cfg(not(feature = "logging"))]
    return Vec::new();
}

/// Tracks how many tasks are inside their work function at once.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn queued_task_starts_when_first_slot_frees() {
    let _t = support::trace_init();
    let limiter = Limiter::new(2).unwrap();
    let start = Instant::now();

    let call = move |id: &'static str, ms: u64| {
        move || async move {
            sleep_ms(ms).await;
            Ok::<_, String>((id, ms_since(start)))
        }
    };

    let a = limiter.submit(call("A", 100));
    let b = limiter.submit(call("B", 100));
    let c = limiter.submit(call("C", 50));
    assert_eq!(
        limiter.stats(),
        LimiterStats {
            limit: 2,
            active: 2,
            queued: 1
        }
    );

    let (a, b, c) = tokio::join!(a, b, c);
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!((a.0, b.0, c.0), ("A", "B", "C"));
    assert!((100..110).contains(&a.1), "A finished at {}ms", a.1);
    assert!((100..110).contains(&b.1), "B finished at {}ms", b.1);
    assert!((150..160).contains(&c.1), "C finished at {}ms", c.1);
}

#[tokio::test(start_paused = true)]
async fn failure_is_isolated_and_frees_its_slot() {
    let _t = support::trace_init();
    let limiter = Limiter::new(2).unwrap();
    let start = Instant::now();

    let a = limiter.submit(move || async move {
        sleep_ms(50).await;
        Ok::<_, String>(ms_since(start))
    });
    let b = limiter.submit(|| async {
        sleep_ms(10).await;
        Err::<u64, _>("boom".to_string())
    });
    let c = limiter.submit(move || {
        let admitted = ms_since(start);
        async move {
            sleep_ms(30).await;
            Ok::<_, String>((admitted, ms_since(start)))
        }
    });

    let (a, b, c) = tokio::join!(a, b, c);

    let b = b.unwrap_err();
    assert_eq!(b.as_label(), "task_failed");
    assert_eq!(b.into_failure().as_deref(), Some("boom"));

    let (c_admitted, c_done) = c.unwrap();
    assert!((10..15).contains(&c_admitted), "C admitted at {c_admitted}ms");
    assert!((40..45).contains(&c_done), "C finished at {c_done}ms");

    let a_done = a.unwrap();
    assert!((50..55).contains(&a_done), "A finished at {a_done}ms");

    limiter.wait_idle().await;
    assert!(limiter.stats().is_idle());
}

#[test]
fn non_positive_limits_are_rejected() {
    assert_eq!(
        Limiter::new(0).unwrap_err(),
        ConfigError::NonPositiveLimit { limit: 0 }
    );
    assert_eq!(
        Limiter::try_from(-1i64).unwrap_err(),
        ConfigError::NonPositiveLimit { limit: -1 }
    );
    assert!(
        Limiter::builder(LimiterConfig::with_limit(0))
            .with_subscribers(log_subscribers())
            .build()
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn equal_tasks_run_in_waves_of_limit() {
    let _t = support::trace_init();
    let limiter = Limiter::new(3).unwrap();
    let gauge = Arc::new(Gauge::default());
    let start = Instant::now();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let gauge = gauge.clone();
            limiter.submit(move || async move {
                let started = ms_since(start);
                gauge.enter();
                sleep_ms(100).await;
                gauge.exit();
                Ok::<_, String>((i, started))
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let total = ms_since(start);

    assert_eq!(gauge.peak(), 3);
    assert!((200..220).contains(&total), "took {total}ms");
    for (i, started) in results {
        if i < 3 {
            assert!(started < 10, "task {i} started at {started}ms");
        } else {
            assert!((100..110).contains(&started), "task {i} started at {started}ms");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_limit_under_mixed_outcomes() {
    let limiter = Limiter::new(4).unwrap();
    let gauge = Arc::new(Gauge::default());

    let handles: Vec<_> = (0..64u64)
        .map(|i| {
            let gauge = gauge.clone();
            limiter.submit(move || async move {
                gauge.enter();
                sleep_ms(i % 5).await;
                gauge.exit();
                if i % 7 == 0 {
                    Err(format!("task {i} failed"))
                } else {
                    Ok(i)
                }
            })
        })
        .collect();

    for (i, res) in join_all(handles).await.into_iter().enumerate() {
        match res {
            Ok(v) => assert_eq!(v, i as u64),
            Err(e) => {
                assert_eq!(i % 7, 0);
                assert_eq!(e.into_failure(), Some(format!("task {i} failed")));
            }
        }
    }

    assert!(gauge.peak() <= 4, "peak concurrency {}", gauge.peak());
    limiter.wait_idle().await;
    assert!(limiter.stats().is_idle());
}

#[tokio::test]
async fn queued_tasks_are_admitted_in_submission_order() {
    let limiter = Limiter::new(1).unwrap();
    let mut rx = limiter.subscribe();
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = ["first", "second", "third", "fourth"]
        .into_iter()
        .map(|name| {
            let order = order.clone();
            limiter.submit_named(name, move || async move {
                order.lock().unwrap().push(name);
                tokio::task::yield_now().await;
                Ok::<_, String>(())
            })
        })
        .collect();
    let ids: Vec<u64> = handles.iter().map(|h| h.id().as_u64()).collect();

    for res in join_all(handles).await {
        res.unwrap();
    }
    limiter.wait_idle().await;

    assert_eq!(
        *order.lock().unwrap(),
        vec!["first", "second", "third", "fourth"]
    );

    let mut admitted = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) if ev.kind == EventKind::TaskAdmitted => {
                assert!(ev.active.unwrap() <= 1);
                admitted.push(ev.task_id.unwrap());
            }
            Ok(_) => {}
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("unexpected receive error: {e}"),
        }
    }
    assert_eq!(admitted, ids);
}

#[tokio::test]
async fn panicking_task_settles_only_its_own_handle() {
    let _t = support::trace_init();
    let limiter = Limiter::builder(LimiterConfig::with_limit(2))
        .with_subscribers(log_subscribers())
        .build()
        .unwrap();

    let before = limiter.submit(|| async { Ok::<_, String>("before") });
    let panicked = limiter.submit(|| async {
        if true {
            panic!("worker exploded");
        }
        Ok::<&str, String>("unreachable")
    });
    let after = limiter.submit(|| async { Ok::<_, String>("after") });

    assert_eq!(before.await.unwrap(), "before");
    match panicked.await {
        Err(TaskError::Panicked { reason }) => assert_eq!(reason, "worker exploded"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(after.await.unwrap(), "after");

    limiter.shutdown().await;
    assert_eq!(limiter.active(), 0);
    assert_eq!(limiter.queued(), 0);
}

#[tokio::test]
async fn clones_share_one_limit() {
    let limiter = Limiter::new(1).unwrap();
    let other = limiter.clone();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let blocking = limiter.submit(move || async move {
        let _ = rx.await;
        Ok::<_, String>(())
    });
    let waiting = other.submit(|| async { Ok::<_, String>(()) });

    assert_eq!(other.active(), 1);
    assert_eq!(limiter.queued(), 1);

    tx.send(()).unwrap();
    blocking.await.unwrap();
    waiting.await.unwrap();
}

#[tokio::test]
async fn submit_with_passes_arguments() {
    async fn fetch((id, attempt): (&'static str, u32)) -> Result<String, String> {
        Ok(format!("{id}#{attempt}"))
    }

    let limiter = Limiter::new(2).unwrap();
    let h = limiter.submit_with(fetch, ("users", 3));
    assert_eq!(h.await.unwrap(), "users#3");
}
