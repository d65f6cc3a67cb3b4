use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_daemon::{run_with, CycleRunner};
use tempfile::TempDir;
use tokio::sync::broadcast;

#[derive(Default)]
struct CountingCycle {
    runs: AtomicUsize,
}

impl CycleRunner for CountingCycle {
    fn run_cycle(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
}

impl CountingCycle {
    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

async fn wait_until(mut check: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

fn save(path: &Path, body: &str) {
    fs::write(path, body).expect("write proxy file");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_trigger_cycles_and_survive_atomic_saves() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("main.styl");
    save(&source, "// gvfs://host/site/style\nbody\n  margin 0\n");

    let runner = Arc::new(CountingCycle::default());
    let (shutdown_tx, _) = broadcast::channel(4);
    let daemon = tokio::spawn(run_with(
        source.clone(),
        runner.clone(),
        Duration::from_millis(20),
        shutdown_tx.clone(),
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(runner.runs(), 0, "startup alone never publishes");

    save(&source, "// gvfs://host/site/style\nbody\n  margin 1px\n");
    wait_until(|| runner.runs() >= 1, "first cycle").await;

    // Editors that save by renaming a temp file over the original.
    let temp = dir.path().join(".main.styl.swp");
    save(&temp, "// gvfs://host/site/style\nbody\n  margin 2px\n");
    fs::rename(&temp, &source).expect("rename over proxy file");
    tokio::time::sleep(Duration::from_millis(400)).await;

    let before = runner.runs();
    save(&source, "// gvfs://host/site/style\nbody\n  margin 3px\n");
    wait_until(|| runner.runs() > before, "cycle after re-arm").await;

    let _ = shutdown_tx.send(());
    let joined = tokio::time::timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon stops on shutdown")
        .expect("daemon task joins");
    tokio_test::assert_ok!(joined);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deleting_the_proxy_file_for_good_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("main.styl");
    save(&source, "/srv/www/style\n");

    let runner = Arc::new(CountingCycle::default());
    let (shutdown_tx, _) = broadcast::channel(4);
    let daemon = tokio::spawn(run_with(
        source.clone(),
        runner,
        Duration::from_millis(20),
        shutdown_tx,
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    fs::remove_file(&source).expect("remove proxy file");

    let result = tokio::time::timeout(Duration::from_secs(5), daemon)
        .await
        .expect("daemon exits after failed re-arm")
        .expect("daemon task joins");
    let err = tokio_test::assert_err!(result);
    assert!(err.to_string().contains("failed to watch"), "{err}");
}
