use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use event_store::{EventEnvelope, EventStore, EventStoreExt, InMemoryEventStore, Version};

fn product_selected(cart_id: AggregateId, version: i64) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(cart_id)
        .aggregate_type("FoodCart")
        .event_type("ProductSelected")
        .version(Version::new(version))
        .payload_raw(serde_json::json!({
            "type": "ProductSelected",
            "data": {
                "food_cart_id": cart_id.to_string(),
                "product_id": "00000000-0000-0000-0000-000000000001",
                "quantity": 1
            }
        }))
        .build()
        .unwrap()
}

fn bench_append_single_event(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_single_event", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let cart_id = AggregateId::new();
                store
                    .append_to_stream(
                        cart_id,
                        Version::initial(),
                        vec![product_selected(cart_id, 1)],
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_append_batch_10(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("event_store/append_batch_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryEventStore::new();
                let cart_id = AggregateId::new();
                let events = (1..=10).map(|v| product_selected(cart_id, v)).collect();
                store
                    .append_to_stream(cart_id, Version::initial(), events)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_read_stream_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let cart_id = AggregateId::new();

    rt.block_on(async {
        let events = (1..=100).map(|v| product_selected(cart_id, v)).collect();
        store
            .append_to_stream(cart_id, Version::initial(), events)
            .await
            .unwrap();
    });

    c.bench_function("event_store/read_stream_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.read_stream(cart_id).await.unwrap();
            });
        });
    });
}

fn bench_load_aggregate_among_many_streams(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let target = AggregateId::new();

    rt.block_on(async {
        for _ in 0..1_000 {
            let other = AggregateId::new();
            let events = (1..=5).map(|v| product_selected(other, v)).collect();
            store
                .append_to_stream(other, Version::initial(), events)
                .await
                .unwrap();
        }
        let events = (1..=5).map(|v| product_selected(target, v)).collect();
        store
            .append_to_stream(target, Version::initial(), events)
            .await
            .unwrap();
    });

    c.bench_function("event_store/load_aggregate_1000_streams", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.load_aggregate(target).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_append_single_event,
    bench_append_batch_10,
    bench_read_stream_100,
    bench_load_aggregate_among_many_streams,
);
criterion_main!(benches);
