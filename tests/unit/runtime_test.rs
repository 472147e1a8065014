//! Tests for tokio spawner utilities

use prometheus_admission_queue::core::Spawn;
use prometheus_admission_queue::runtime::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_with_handle() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[tokio::test]
async fn test_tokio_spawner_ambient_runtime() {
    let spawner = TokioSpawner::default();

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send("ambient").unwrap();
    });

    assert_eq!(rx.await.unwrap(), "ambient");
}

#[test]
fn test_tokio_spawner_try_current_outside_runtime() {
    assert!(TokioSpawner::try_current().is_err());
}
