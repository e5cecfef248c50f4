//! 重启恢复测试
//!
//! 使用磁盘上的订单库和 journal (tempdir)，验证：
//! - 重启后缓存从订单库完整恢复
//! - 已确认的消息不会重新投递
//! - 未确认的消息在重启后重新投递，重复处理不产生重复数据

use std::collections::HashSet;
use std::time::Duration;

use order_server::{Config, IngestOutcome, SaveOutcome, ServerState};
use rand::Rng;
use shared::order::{Delivery, Item, Order, Payment};

const ORDER_COUNT: usize = 200;

/// 生成随机订单
fn random_order(rng: &mut impl Rng, idx: usize) -> Order {
    const BRANDS: &[&str] = &["Vivienne Sabo", "Nike", "Xiaomi", "Lego", "Bosch"];

    let items: Vec<Item> = (0..rng.gen_range(1..=4))
        .map(|_| {
            let price = rng.gen_range(100..5000);
            let sale = rng.gen_range(0..50);
            Item {
                chrt_id: rng.gen_range(1_000_000..9_999_999),
                track_number: format!("TRACK{}", idx),
                price,
                rid: format!("rid-{}-{}", idx, rng.r#gen::<u32>()),
                name: "Item".into(),
                sale,
                size: "0".into(),
                total_price: price * (100 - sale) / 100,
                nm_id: rng.gen_range(1_000_000..9_999_999),
                brand: BRANDS[rng.gen_range(0..BRANDS.len())].into(),
                status: 202,
            }
        })
        .collect();

    let goods_total = items.iter().map(|i| i.total_price).sum();
    let delivery_cost = rng.gen_range(0..2000);

    Order {
        order_uid: format!("order-{:05}-{:08x}", idx, rng.r#gen::<u32>()),
        track_number: format!("TRACK{}", idx),
        entry: "WBIL".into(),
        delivery: Delivery {
            name: "Test Testov".into(),
            phone: "+9720000000".into(),
            city: "Kiryat Mozkin".into(),
            ..Default::default()
        },
        payment: Payment {
            transaction: format!("tx-{}", idx),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: goods_total + delivery_cost,
            delivery_cost,
            goods_total,
            ..Default::default()
        },
        items,
        locale: "en".into(),
        customer_id: "test".into(),
        delivery_service: "meest".into(),
        shardkey: "9".into(),
        sm_id: 99,
        date_created: chrono::Utc::now(),
        oof_shard: "1".into(),
        ..Default::default()
    }
}

fn config_in(dir: &tempfile::TempDir) -> Config {
    Config::with_overrides(dir.path().to_string_lossy(), 0, 0)
}

#[tokio::test]
async fn test_restart_recovers_cache_without_redelivery() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let mut rng = rand::thread_rng();

    let orders: Vec<Order> = (0..ORDER_COUNT).map(|i| random_order(&mut rng, i)).collect();

    // First run: publish everything (plus duplicates and junk), ingest, stop
    {
        let state = ServerState::initialize(&config).unwrap();
        assert_eq!(state.recover_cache(), 0);

        let channel = config.order_channel.clone();
        for order in &orders {
            state
                .bus
                .publish(&channel, &serde_json::to_vec(order).unwrap())
                .unwrap();
        }
        state.bus.publish(&channel, br#"{"order_uid":""}"#).unwrap();
        for order in orders.iter().take(10) {
            state
                .bus
                .publish(&channel, &serde_json::to_vec(order).unwrap())
                .unwrap();
        }
        // sentinel: everything before it has been handled once it is cached
        let sentinel = random_order(&mut rng, ORDER_COUNT);
        state
            .bus
            .publish(&channel, &serde_json::to_vec(&sentinel).unwrap())
            .unwrap();

        let subscription = state
            .bus
            .subscribe(&channel, &config.durable_name)
            .unwrap();
        let pipeline = tokio::spawn(
            state
                .pipeline()
                .run(subscription, state.shutdown_token.clone()),
        );

        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        while state.cache.get(&sentinel.order_uid).is_none() {
            assert!(tokio::time::Instant::now() < deadline, "ingestion stalled");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        state.shutdown();
        pipeline.await.unwrap();
        assert_eq!(state.cache.count(), ORDER_COUNT + 1);
        assert_eq!(state.store.count().unwrap(), (ORDER_COUNT + 1) as u64);
    }

    // Second run: cache comes back from the store, nothing left to deliver
    let state = ServerState::initialize(&config).unwrap();
    assert_eq!(state.recover_cache(), ORDER_COUNT + 1);

    for order in &orders {
        let cached = state.cache.get(&order.order_uid).unwrap();
        assert_eq!(cached.as_ref(), order);
    }

    let mut subscription = state
        .bus
        .subscribe(&config.order_channel, &config.durable_name)
        .unwrap();
    let next = tokio::time::timeout(Duration::from_millis(200), subscription.next()).await;
    assert!(next.is_err(), "acknowledged messages were delivered again");
}

#[tokio::test]
async fn test_unacked_messages_are_redelivered_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let mut rng = rand::thread_rng();

    let orders: Vec<Order> = (0..5).map(|i| random_order(&mut rng, i)).collect();

    // First run: every message is processed, but the process "dies" before
    // acknowledging the last three
    {
        let state = ServerState::initialize(&config).unwrap();
        for order in &orders {
            state
                .bus
                .publish(&config.order_channel, &serde_json::to_vec(order).unwrap())
                .unwrap();
        }

        let mut subscription = state
            .bus
            .subscribe(&config.order_channel, &config.durable_name)
            .unwrap();
        let pipeline = state.pipeline();

        for i in 0..orders.len() {
            let delivery = subscription.next().await.unwrap().unwrap();
            let outcome = pipeline.process(&delivery.payload).await;
            assert!(outcome.is_cached());
            if i < 2 {
                subscription.ack(&delivery).await.unwrap();
            }
        }
    }

    // Second run: the three unacknowledged messages come back
    let state = ServerState::initialize(&config).unwrap();
    assert_eq!(state.recover_cache(), orders.len());

    let mut subscription = state
        .bus
        .subscribe(&config.order_channel, &config.durable_name)
        .unwrap();
    let pipeline = state.pipeline();

    let mut redelivered = HashSet::new();
    for _ in 0..3 {
        let delivery = subscription.next().await.unwrap().unwrap();
        match pipeline.process(&delivery.payload).await {
            IngestOutcome::Cached { order_uid, write } => {
                assert_eq!(write, SaveOutcome::AlreadyPresent);
                redelivered.insert(order_uid);
            }
            IngestOutcome::Rejected(reason) => panic!("redelivery rejected: {}", reason),
        }
        subscription.ack(&delivery).await.unwrap();
    }

    let expected: HashSet<String> = orders[2..].iter().map(|o| o.order_uid.clone()).collect();
    assert_eq!(redelivered, expected);

    // duplicates collapsed on the order_uid key
    assert_eq!(state.store.count().unwrap(), orders.len() as u64);
    assert_eq!(state.cache.count(), orders.len());
}
