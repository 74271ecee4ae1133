//! Integration tests for the persisted cart store

use rust_decimal::Decimal;
use rusty_money::{Money, iso::USD};
use tempfile::tempdir;
use testresult::TestResult;

use tatami::{
    cart::{CartError, CartLineItem, CartProduct},
    storage::{CART_STORAGE_KEY, CartStorage, FileStorage, MemoryStorage},
    store::CartStore,
};

fn catalogue() -> [CartProduct; 4] {
    [
        CartProduct::new("gi", "Premium BJJ Gi", Decimal::from(149)),
        CartProduct::new("gloves", "Boxing Gloves 16oz", Decimal::new(89_50, 2)),
        CartProduct::new("wraps", "Hand Wraps", Decimal::new(12_99, 2))
            .with_image("/images/wraps.jpg"),
        CartProduct::new("belt", "Belt", Decimal::new(25, 0)),
    ]
}

fn recomputed_total(items: &[CartLineItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

#[test]
fn count_and_total_track_every_add_and_remove() -> TestResult {
    let catalogue = catalogue();
    let mut store = CartStore::new(MemoryStorage::new(), USD);

    // (product index, quantity); zero means remove.
    let script = [
        (0, 2),
        (1, 1),
        (0, 3),
        (2, 4),
        (3, 0),
        (1, 0),
        (3, 1),
        (2, 1),
        (1, 7),
        (0, 0),
        (0, 0),
        (3, 2),
    ];

    for (index, quantity) in script {
        let product = catalogue.get(index).ok_or("unknown product")?;

        if quantity == 0 {
            store.remove_item(&product.id);
        } else {
            store.add_item(product.clone(), quantity)?;
        }

        let expected_count: u64 = store.items().iter().map(|item| u64::from(item.quantity)).sum();

        assert_eq!(store.count(), expected_count);
        assert_eq!(
            store.total(),
            Money::from_decimal(recomputed_total(store.items()), USD)
        );
    }

    let quantities: Vec<(&str, u32)> = store
        .items()
        .iter()
        .map(|item| (item.id.as_str(), item.quantity))
        .collect();

    assert_eq!(quantities, [("wraps", 5), ("belt", 3), ("gloves", 7)]);

    Ok(())
}

#[test]
fn same_id_twice_is_one_row() -> TestResult {
    let [gi, ..] = catalogue();
    let mut store = CartStore::new(MemoryStorage::new(), USD);

    store.add_item(gi.clone(), 2)?;
    store.add_item(gi, 3)?;

    assert_eq!(store.items().len(), 1);
    assert_eq!(store.count(), 5);

    Ok(())
}

#[test]
fn removing_unknown_id_changes_nothing() -> TestResult {
    let [gi, gloves, ..] = catalogue();
    let mut store = CartStore::new(MemoryStorage::new(), USD);

    store.add_item(gi, 1)?;
    store.add_item(gloves, 2)?;

    let before = store.cart().clone();

    assert_eq!(store.remove_item("kimono"), None);
    assert_eq!(store.cart(), &before);
    assert_eq!(store.total(), Money::from_minor(328_00, USD));

    Ok(())
}

#[test]
fn clear_always_zeroes() -> TestResult {
    let mut store = CartStore::new(MemoryStorage::new(), USD);

    store.clear();

    assert_eq!(store.count(), 0);
    assert_eq!(store.total(), Money::from_minor(0, USD));

    for product in catalogue() {
        store.add_item(product, 3)?;
    }

    store.clear();

    assert_eq!(store.count(), 0);
    assert_eq!(store.total(), Money::from_minor(0, USD));

    Ok(())
}

#[test]
fn cart_round_trips_through_files() -> TestResult {
    let dir = tempdir()?;
    let mut store = CartStore::new(FileStorage::new(dir.path()), USD);

    for (quantity, product) in (1..).zip(catalogue()) {
        store.add_item(product, quantity)?;
    }

    let saved = store.items().to_vec();

    drop(store);

    let restored = CartStore::load(FileStorage::new(dir.path()), USD);

    assert!(restored.warning().is_none());
    assert_eq!(restored.items(), saved.as_slice());
    assert_eq!(restored.items().len(), 4);

    Ok(())
}

#[test]
fn stored_duplicates_are_merged_on_load() -> TestResult {
    let mut storage = MemoryStorage::new();

    storage.write(
        CART_STORAGE_KEY,
        r#"{"products":[
            {"id":"gi","name":"Gi","price":149,"quantity":1},
            {"id":"belt","name":"Belt","price":25,"quantity":0},
            {"id":"gi","name":"Gi","price":149,"quantity":2}
        ]}"#,
    )?;

    let store = CartStore::load(storage, USD);

    assert_eq!(store.items().len(), 1);
    assert_eq!(store.count(), 3);

    Ok(())
}

#[test]
fn corrupt_record_loads_empty_with_warning() -> TestResult {
    let mut storage = MemoryStorage::new();

    storage.write(CART_STORAGE_KEY, "{not json")?;

    let mut store = CartStore::load(storage, USD);

    assert!(store.cart().is_empty());
    assert!(store.warning().is_some());

    store.add_item(CartProduct::new("gi", "Gi", Decimal::from(149)), 1)?;

    assert!(store.warning().is_none());

    Ok(())
}

#[test]
fn overflowing_total_is_never_stored() -> TestResult {
    let mut store = CartStore::new(MemoryStorage::new(), USD);
    let huge = CartProduct::new(
        "x",
        "X",
        Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
    );

    assert_eq!(
        store.add_item(huge, u32::MAX),
        Err(CartError::TotalOverflow("x".to_string()))
    );
    assert!(store.cart().is_empty());
    assert_eq!(store.total(), Money::from_minor(0, USD));

    Ok(())
}

#[test]
fn stored_rows_that_overflow_are_dropped_on_load() -> TestResult {
    let mut storage = MemoryStorage::new();

    storage.write(
        CART_STORAGE_KEY,
        r#"{"products":[
            {"id":"gi","name":"Gi","price":149,"quantity":1},
            {"id":"x","name":"X","price":1e20,"quantity":4294967295}
        ]}"#,
    )?;

    let store = CartStore::load(storage, USD);

    assert_eq!(store.items().len(), 1);
    assert_eq!(store.total(), Money::from_minor(149_00, USD));

    Ok(())
}
