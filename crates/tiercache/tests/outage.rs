//! Degradation behaviour when the remote store (and with it the channel)
//! goes away mid-flight. Uses a dedicated container so stopping it does
//! not disturb other tests.

use std::time::Duration;

use testcontainers::runners::AsyncRunner;
use testcontainers_modules::redis::Redis;
use tiercache::{CacheConfig, CacheError, CacheManager, Value};

#[tokio::test]
async fn test_reads_survive_outage_writes_fail_loudly() {
    let container = Redis::default().start().await.expect("start redis");
    let port = container.get_host_port_ipv4(6379).await.expect("get port");

    let mut config = CacheConfig::for_url(format!("redis://127.0.0.1:{port}"));
    config.namespace = "outage".into();
    config.channel = "outage.events".into();
    config.redis.connect_timeout_ms = 500;

    let a = CacheManager::init(config).await.unwrap();
    a.put("users", "u1", Value::Str("b".into())).await.unwrap();
    assert_eq!(
        a.get("users", "u1").await.unwrap().unwrap().as_str(),
        Some("b")
    );

    container.stop().await.expect("stop redis");
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The near cache keeps serving the last-known value.
    assert_eq!(
        a.get("users", "u1").await.unwrap().unwrap().as_str(),
        Some("b")
    );
    // A key that is not near-cached degrades to a miss, not an error.
    assert!(a.get("users", "cold").await.unwrap().is_none());

    // Writes fail loudly and leave the near cache untouched.
    let err = a
        .put("users", "u1", Value::Str("c".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::L2Unavailable(_)));
    assert_eq!(
        a.peek_l1("users", "u1").unwrap().as_str(),
        Some("b")
    );

    a.shutdown().await;
}
