use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, AggregateRepository, ConfirmOrder, CreateFoodCart, FoodCart, FoodCartEvent,
    FoodCartService, ProductId, SelectProduct,
};
use event_store::{EventStore, InMemoryEventStore, Version};

/// Writes one create plus `selections` product selections, one event per save.
fn populate(
    rt: &tokio::runtime::Runtime,
    repo: &AggregateRepository<InMemoryEventStore, FoodCart>,
    cart_id: AggregateId,
    selections: i64,
) {
    rt.block_on(async {
        let product = ProductId::new();
        let mut version = repo
            .save(cart_id, Version::initial(), &[FoodCartEvent::food_cart_created(cart_id)])
            .await
            .unwrap();
        for _ in 0..selections {
            version = repo
                .save(
                    cart_id,
                    version,
                    &[FoodCartEvent::product_selected(cart_id, product, 1)],
                )
                .await
                .unwrap();
        }
    });
}

fn bench_create_food_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_food_cart", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = FoodCartService::new(InMemoryEventStore::new());
                service
                    .create_food_cart(CreateFoodCart::generate())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_select_product(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = FoodCartService::new(InMemoryEventStore::new());
    let cmd = CreateFoodCart::generate();
    let cart_id = cmd.food_cart_id;
    rt.block_on(async { service.create_food_cart(cmd).await.unwrap() });
    let product = ProductId::new();

    c.bench_function("domain/select_product", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .select_product(SelectProduct::new(cart_id, product, 1))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_full_command_cycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/full_create_select_confirm", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = FoodCartService::new(InMemoryEventStore::new());
                let cmd = CreateFoodCart::generate();
                let cart_id = cmd.food_cart_id;
                service.create_food_cart(cmd).await.unwrap();

                service
                    .select_product(SelectProduct::new(cart_id, ProductId::new(), 2))
                    .await
                    .unwrap();

                service
                    .confirm_order(ConfirmOrder::new(cart_id))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_replay_100_events(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let repo = AggregateRepository::<_, FoodCart>::new(store.clone());
    let cart_id = AggregateId::new();
    populate(&rt, &repo, cart_id, 99);

    c.bench_function("domain/replay_100_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let events = store.read_stream(cart_id).await.unwrap();
                let mut cart = FoodCart::default();
                for envelope in &events {
                    cart.apply(envelope.decode().unwrap());
                }
            });
        });
    });
}

fn bench_load_with_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let repo = AggregateRepository::<_, FoodCart>::with_default_snapshots(store.clone());
    let cart_id = AggregateId::new();
    populate(&rt, &repo, cart_id, 98);
    // Crosses version 100 through the command path so a snapshot is written.
    rt.block_on(async {
        let service = FoodCartService::new(store.clone());
        service
            .select_product(SelectProduct::new(cart_id, ProductId::new(), 1))
            .await
            .unwrap();
    });

    c.bench_function("domain/load_100_events_with_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                repo.load(cart_id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_food_cart,
    bench_select_product,
    bench_full_command_cycle,
    bench_replay_100_events,
    bench_load_with_snapshot,
);
criterion_main!(benches);
