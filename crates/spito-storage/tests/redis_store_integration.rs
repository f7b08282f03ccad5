use std::sync::Arc;
use std::time::Duration;

use spito_core::{SpitDraft, SpitError, SpitKind, SystemClock};
use spito_generator::{ShardPicker, ShardedSettings};
use spito_storage::{
    clicks_key, record_key, IdScheme, KvStorager, KvStore, RedisKvStore, Storager,
    StoragerSettings,
};
use spito_test_infra::RedisServer;

struct Fixture {
    redis: RedisServer,
    store: RedisKvStore,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::start().await.expect("start redis");
        let conn = redis.connection().await.expect("redis connection");
        Self {
            redis,
            store: RedisKvStore::with_prefix(conn, "test:"),
        }
    }
}

#[tokio::test]
async fn put_get_delete_round_trip() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    store.put("doc", b"{\"a\":1}", None).await.unwrap();
    assert_eq!(
        store.get_raw("doc").await.unwrap(),
        Some(b"{\"a\":1}".to_vec())
    );

    assert!(store.delete("doc").await.unwrap());
    assert!(!store.delete("doc").await.unwrap());
    assert_eq!(store.get_raw("doc").await.unwrap(), None);
}

#[tokio::test]
async fn connect_by_url_keeps_prefixes_apart() {
    let fixture = Fixture::start().await;
    let other = RedisKvStore::connect(fixture.redis.url(), "other:")
        .await
        .unwrap();

    fixture.store.put("doc", b"mine", None).await.unwrap();
    assert_eq!(other.get_raw("doc").await.unwrap(), None);

    other.put("doc", b"theirs", None).await.unwrap();
    assert_eq!(
        fixture.store.get_raw("doc").await.unwrap(),
        Some(b"mine".to_vec())
    );
}

#[tokio::test]
async fn increment_seeds_then_adds() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    assert_eq!(store.atomic_increment("n", 1, 10, None).await.unwrap(), 10);
    assert_eq!(store.atomic_increment("n", 1, 10, None).await.unwrap(), 11);
    assert_eq!(store.atomic_increment("n", 0, 0, None).await.unwrap(), 11);
    assert_eq!(store.get_counter("n").await.unwrap(), Some(11));
    assert_eq!(store.get_counter("missing").await.unwrap(), None);

    store.put_counter("n", 0, None).await.unwrap();
    assert_eq!(store.get_counter("n").await.unwrap(), Some(0));
    assert_eq!(store.atomic_increment("n", 1, 10, None).await.unwrap(), 1);
}

#[tokio::test]
async fn native_ttl_expires_keys() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    store
        .put("ttl", b"x", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    store
        .atomic_increment("ttl-count", 0, 0, Some(Duration::from_secs(1)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(store.get_raw("ttl").await.unwrap(), None);
    assert_eq!(store.get_counter("ttl-count").await.unwrap(), None);
}

#[tokio::test]
async fn conditional_put_keeps_the_first_value() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    assert!(store.conditional_put("alpha", b"one").await.unwrap());
    assert!(!store.conditional_put("alpha", b"two").await.unwrap());
    assert_eq!(store.get_raw("alpha").await.unwrap(), Some(b"one".to_vec()));
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let fixture = Fixture::start().await;
    let store = Arc::new(fixture.store.clone());

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.atomic_increment("hits", 1, 1, None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.get_counter("hits").await.unwrap(), Some(50));
}

#[tokio::test]
async fn storager_lifecycle_over_redis() {
    let fixture = Fixture::start().await;
    let storager = KvStorager::init(
        fixture.store.clone(),
        StoragerSettings::builder()
            .scheme(IdScheme::Sharded(ShardedSettings::builder().build()))
            .picker(ShardPicker::seeded(11))
            .clock(Arc::new(SystemClock))
            .build(),
    )
    .await
    .unwrap();

    let minted = storager.next_id().await.unwrap();
    assert!(storager.validate_id(minted.id.as_str()));

    let spit = SpitDraft::new("http://example.com/path", 0, SpitKind::Url)
        .unwrap()
        .into_spit(minted, jiff::Timestamp::now());
    storager.put(&spit).await.unwrap();

    let viewed = storager.get_with_analytics(spit.id()).await.unwrap();
    assert!(viewed.is_url());
    assert_eq!(viewed.clicks(), 1);

    storager.delete(spit.id()).await.unwrap();
    assert_eq!(
        fixture.store.get_raw(&record_key(spit.id())).await.unwrap(),
        None
    );
    assert_eq!(
        fixture.store.get_counter(&clicks_key(spit.id())).await.unwrap(),
        None
    );
    assert!(matches!(
        storager.delete(spit.id()).await,
        Err(SpitError::NotFound(_))
    ));
}

#[tokio::test]
async fn second_process_adopts_the_same_alphabets() {
    let fixture = Fixture::start().await;
    let settings = || {
        StoragerSettings::builder()
            .scheme(IdScheme::Sharded(ShardedSettings::builder().build()))
            .build()
    };

    let first = KvStorager::init(fixture.store.clone(), settings())
        .await
        .unwrap();
    let second = KvStorager::init(fixture.store.clone(), settings())
        .await
        .unwrap();

    for _ in 0..10 {
        let id = first.next_id().await.unwrap().id;
        assert!(second.validate_id(id.as_str()));
    }
}

#[tokio::test]
async fn outage_surfaces_as_store_unavailable() {
    let fixture = Fixture::start().await;
    let storager = KvStorager::init(
        fixture.store.clone(),
        StoragerSettings::builder()
            .op_timeout(Duration::from_secs(1))
            .build(),
    )
    .await
    .unwrap();
    let minted = storager.next_id().await.unwrap();
    let id = minted.id.clone();

    fixture.redis.stop().await.expect("stop redis");

    assert!(matches!(
        storager.get(&id).await,
        Err(SpitError::StoreUnavailable { operation: "get", .. })
    ));
    assert!(storager.next_id().await.is_err());
}
