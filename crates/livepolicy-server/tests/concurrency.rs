#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use std::sync::atomic::Ordering;

use common::fake_state;

const WORKERS: usize = 32;
const ROUNDS: usize = 25;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_add_get_delete_on_disjoint_refs() {
    let (app, launcher) = fake_state();
    let reg = app.registry();

    let mut tasks = Vec::new();
    for w in 0..WORKERS {
        let reg = reg.clone();
        tasks.push(tokio::spawn(async move {
            let keeper = format!("keep-{w}");
            reg.add(&keeper, "sys", "tok", "localhost").await.unwrap();

            for i in 0..ROUNDS {
                let r = format!("w{w}-r{i}");
                reg.add(&r, "sys", "tok", "localhost").await.unwrap();
                assert!(reg.get(&r).await.is_some(), "read-your-writes for {r}");
                assert!(reg.list().await.contains(&keeper));
                reg.delete(&r).await;
                assert!(reg.get(&r).await.is_none(), "delete visible for {r}");
            }
        }));
    }

    for t in tasks {
        t.await.expect("worker panicked");
    }

    let refs = reg.list().await;
    assert_eq!(refs.len(), WORKERS);
    assert!(refs.iter().all(|r| r.starts_with("keep-")));
    assert_eq!(launcher.started.load(Ordering::SeqCst), WORKERS * (ROUNDS + 1));
    assert_eq!(launcher.stopped.load(Ordering::SeqCst), WORKERS * ROUNDS);
    assert_eq!(app.metrics().tenants_active.get(&[]), WORKERS as i64);
}
