use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

use menu_rs::models::{CreateMenuItemRequest, UpdateMenuItemRequest};
use menu_rs::repositories::{InMemoryMenuItemStore, MenuItemStore};
use menu_rs::services::MenuItemService;

fn create_request(index: usize) -> CreateMenuItemRequest {
    serde_json::from_value(json!({
        "name": format!("Benchmark Item {}", index),
        "description": "Benchmark description",
        "price": 4.25,
    }))
    .unwrap()
}

fn seeded_service(rt: &Runtime, size: usize) -> (Arc<MenuItemService>, Vec<String>) {
    let store: Arc<dyn MenuItemStore> = Arc::new(InMemoryMenuItemStore::new());
    let service = Arc::new(MenuItemService::new(store));

    let ids = rt.block_on(async {
        let mut ids = Vec::with_capacity(size);
        for i in 0..size {
            let item = service.create(create_request(i)).await.unwrap();
            ids.push(item.id.to_string());
        }
        ids
    });

    (service, ids)
}

fn bench_menu_create(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (service, _) = seeded_service(&rt, 0);

    c.bench_function("menu_create", |b| {
        b.iter(|| {
            rt.block_on(async { black_box(service.create(create_request(0)).await.unwrap()) })
        })
    });
}

fn bench_menu_list(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("menu_list");

    for size in [10, 100, 1000] {
        let (service, _) = seeded_service(&rt, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| rt.block_on(async { black_box(service.list().await.unwrap()) }))
        });
    }

    group.finish();
}

fn bench_menu_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (service, ids) = seeded_service(&rt, 100);
    let id = ids[ids.len() / 2].clone();

    c.bench_function("menu_update_price", |b| {
        b.iter(|| {
            let request: UpdateMenuItemRequest =
                serde_json::from_value(json!({"price": 5.5})).unwrap();
            rt.block_on(async { black_box(service.update(&id, request).await.unwrap()) })
        })
    });
}

criterion_group!(benches, bench_menu_create, bench_menu_list, bench_menu_update);
criterion_main!(benches);
