//! Integration tests for the transaction engine.
//!
//! Every test runs against a fresh in-memory SQLite database with the real
//! migrations applied, exercising the full post/reverse/adjust protocols
//! through the public API.

use chrono::Utc;
use uuid::Uuid;

use tally_core::{InventoryItem, LedgerError, TransactionKind};
use tally_db::{Database, DbConfig, LedgerFilter};
use tally_engine::{LedgerQuery, PostRequest, SummaryProjector, TransactionEngine};

// =============================================================================
// Test Fixtures
// =============================================================================

async fn setup() -> (Database, TransactionEngine, SummaryProjector, LedgerQuery) {
    // Log output for failing tests: RUST_LOG=debug cargo test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let engine = TransactionEngine::new(db.clone());
    let projector = SummaryProjector::new(db.clone());
    let query = LedgerQuery::new(db.clone());
    (db, engine, projector, query)
}

async fn seed_category(db: &Database, name: &str, initial_capital_cents: i64) -> String {
    db.categories()
        .create(name, initial_capital_cents)
        .await
        .unwrap()
        .id
}

async fn seed_item(db: &Database, category_id: &str, code: &str, quantity: i64) -> String {
    let now = Utc::now();
    let item = InventoryItem {
        id: Uuid::new_v4().to_string(),
        category_id: category_id.to_string(),
        code: code.to_string(),
        name: format!("{code} (test)"),
        cost_price_cents: 150,
        selling_price_cents: 299,
        quantity,
        min_stock: 0,
        max_stock: 100,
        created_at: now,
        updated_at: now,
    };
    db.inventory().insert(&item).await.unwrap();
    item.id
}

// =============================================================================
// Post: Sales
// =============================================================================

#[tokio::test]
async fn post_sale_decrements_stock_and_appends_entry() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 3, 897, "cash"))
        .await
        .unwrap();

    assert_eq!(entry.kind, TransactionKind::Sale);
    assert_eq!(entry.item_id.as_deref(), Some(item.as_str()));
    assert_eq!(entry.quantity, Some(3));
    assert_eq!(query.item_quantity(&item).await.unwrap(), 7);

    let listed = query.list_entries(&LedgerFilter::for_category(&cat)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, entry.id);
}

#[tokio::test]
async fn sale_of_exact_stock_then_one_more() {
    // Item has quantity 5: selling 5 succeeds and zeroes the shelf,
    // selling 1 more fails with the available figure
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 5).await;

    engine
        .post(PostRequest::sale(&cat, &item, 5, 1495, "cash"))
        .await
        .unwrap();
    assert_eq!(query.item_quantity(&item).await.unwrap(), 0);

    let err = engine
        .post(PostRequest::sale(&cat, &item, 1, 299, "cash"))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientStock {
            code,
            available,
            requested,
        } => {
            assert_eq!(code, "COKE-330");
            assert_eq!(available, 0);
            assert_eq!(requested, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // The failed post left no trace in the ledger
    let listed = query.list_entries(&LedgerFilter::for_category(&cat)).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn concurrent_sales_of_last_unit_one_wins() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "LAST-ONE", 1).await;

    let (a, b) = tokio::join!(
        engine.post(PostRequest::sale(&cat, &item, 1, 299, "cash")),
        engine.post(PostRequest::sale(&cat, &item, 1, 299, "card")),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one sale of the last unit may win");

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(loser, LedgerError::InsufficientStock { .. }));

    assert_eq!(query.item_quantity(&item).await.unwrap(), 0);
}

#[tokio::test]
async fn post_sale_rejects_bad_references_and_fields() {
    let (db, engine, _, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 5).await;

    // Unknown category
    let err = engine
        .post(PostRequest::sale("no-such-category", &item, 1, 299, "cash"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "Category", .. }));

    // Unknown item
    let err = engine
        .post(PostRequest::sale(&cat, "no-such-item", 1, 299, "cash"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "InventoryItem", .. }));

    // Non-positive amount
    let err = engine
        .post(PostRequest::sale(&cat, &item, 1, 0, "cash"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount { .. }));

    // Non-positive quantity
    let err = engine
        .post(PostRequest::sale(&cat, &item, 0, 299, "cash"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidQuantity { .. }));

    // Empty fund source
    let err = engine
        .post(PostRequest::sale(&cat, &item, 1, 299, "  "))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

// =============================================================================
// Post: Expenses and Withdrawals
// =============================================================================

#[tokio::test]
async fn expense_cannot_exceed_profit() {
    let (db, engine, _, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 1000_00).await;
    let item = seed_item(&db, &cat, "COKE-330", 50).await;

    // No revenue yet: any expense exceeds profit, and the figures say so
    let err = engine
        .post(PostRequest::expense(&cat, 50_00, "petty cash"))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientFunds {
            fund,
            available,
            requested,
        } => {
            assert_eq!(fund, "profit");
            assert_eq!(available.cents(), 0);
            assert_eq!(requested.cents(), 50_00);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    // $100 of revenue makes a $40 expense affordable, but not $140
    engine
        .post(PostRequest::sale(&cat, &item, 1, 100_00, "cash"))
        .await
        .unwrap();
    engine
        .post(PostRequest::expense(&cat, 40_00, "petty cash"))
        .await
        .unwrap();
    let err = engine
        .post(PostRequest::expense(&cat, 100_00, "petty cash"))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientFunds { fund, available, .. } => {
            assert_eq!(fund, "profit");
            assert_eq!(available.cents(), 60_00);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
}

#[tokio::test]
async fn capital_withdrawal_scenario() {
    // Category with initial capital 1000: withdrawing 1500 fails,
    // withdrawing 200 succeeds, capital health lands at 800
    let (db, engine, projector, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 1000_00).await;

    let err = engine
        .post(PostRequest::capital_withdrawal(&cat, 1500_00, "owner draw"))
        .await
        .unwrap_err();
    match err {
        LedgerError::InsufficientFunds {
            fund,
            available,
            requested,
        } => {
            assert_eq!(fund, "capital health");
            assert_eq!(available.cents(), 1000_00);
            assert_eq!(requested.cents(), 1500_00);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    engine
        .post(PostRequest::capital_withdrawal(&cat, 200_00, "owner draw"))
        .await
        .unwrap();

    let summary = projector.summary(&cat).await.unwrap();
    assert_eq!(summary.capital_health_cents, 800_00);
}

// =============================================================================
// Summary Projection
// =============================================================================

#[tokio::test]
async fn summary_folds_revenue_expenses_profit() {
    let (db, engine, projector, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 500_00).await;
    let item = seed_item(&db, &cat, "COKE-330", 50).await;

    engine
        .post(PostRequest::sale(&cat, &item, 1, 100_00, "cash"))
        .await
        .unwrap();
    engine
        .post(PostRequest::expense(&cat, 40_00, "supplier"))
        .await
        .unwrap();

    let summary = projector.summary(&cat).await.unwrap();
    assert_eq!(summary.revenue_cents, 100_00);
    assert_eq!(summary.expenses_cents, 40_00);
    assert_eq!(summary.profit_cents, 60_00);
    assert_eq!(summary.capital_health_cents, 500_00);
}

#[tokio::test]
async fn summary_of_unknown_category_is_not_found() {
    let (_, _, projector, _) = setup().await;
    let err = projector.summary("no-such-category").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "Category", .. }));
}

#[tokio::test]
async fn summaries_do_not_cross_categories() {
    let (db, engine, projector, _) = setup().await;
    let bev = seed_category(&db, "Beverages", 0).await;
    let snk = seed_category(&db, "Snacks", 0).await;
    let item = seed_item(&db, &bev, "COKE-330", 10).await;

    engine
        .post(PostRequest::sale(&bev, &item, 2, 598, "cash"))
        .await
        .unwrap();

    assert_eq!(projector.summary(&bev).await.unwrap().revenue_cents, 598);
    assert_eq!(projector.summary(&snk).await.unwrap().revenue_cents, 0);
}

// =============================================================================
// Reverse
// =============================================================================

#[tokio::test]
async fn reverse_restores_stock_and_deletes_entry() {
    // Round-trip law: post then reverse leaves inventory, ledger, and
    // summary exactly as they were
    let (db, engine, projector, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 250_00).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let before_quantity = query.item_quantity(&item).await.unwrap();
    let before_summary = projector.summary(&cat).await.unwrap();

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 4, 1196, "cash"))
        .await
        .unwrap();
    assert_eq!(query.item_quantity(&item).await.unwrap(), 6);

    engine.reverse(&entry.id).await.unwrap();

    assert_eq!(query.item_quantity(&item).await.unwrap(), before_quantity);
    assert_eq!(projector.summary(&cat).await.unwrap(), before_summary);
    assert!(query.entry(&entry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn reverse_is_recorded_not_silent() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 2, 598, "cash"))
        .await
        .unwrap();
    engine.reverse(&entry.id).await.unwrap();

    let reversals = query.reversals(&cat).await.unwrap();
    assert_eq!(reversals.len(), 1);
    let record = &reversals[0];
    assert_eq!(record.entry_id, entry.id);
    assert_eq!(record.kind, TransactionKind::Sale);
    assert_eq!(record.amount_cents, 598);
    assert_eq!(record.quantity, Some(2));
}

#[tokio::test]
async fn reverse_missing_or_repeated_is_not_found() {
    let (db, engine, _, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    // Never existed
    let err = engine.reverse("no-such-entry").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "LedgerEntry", .. }));

    // Already reversed: the retry must not silently succeed
    let entry = engine
        .post(PostRequest::sale(&cat, &item, 1, 299, "cash"))
        .await
        .unwrap();
    engine.reverse(&entry.id).await.unwrap();
    let err = engine.reverse(&entry.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "LedgerEntry", .. }));
}

#[tokio::test]
async fn reverse_surfaces_item_removed_out_of_band() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 2, 598, "cash"))
        .await
        .unwrap();

    // Catalog administration retires the item while the sale is on the books
    db.inventory().remove(&item).await.unwrap();

    let err = engine.reverse(&entry.id).await.unwrap_err();
    match err {
        LedgerError::InventoryItemMissing { item_id } => assert_eq!(item_id, item),
        other => panic!("expected InventoryItemMissing, got {other:?}"),
    }

    // Nothing committed: the entry is still on the books
    assert!(query.entry(&entry.id).await.unwrap().is_some());
    assert!(query.reversals(&cat).await.unwrap().is_empty());
}

// =============================================================================
// Adjust
// =============================================================================

#[tokio::test]
async fn adjust_rewrites_amount_and_keeps_history() {
    let (db, engine, projector, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    // Mis-keyed sale: $29.90 instead of $2.99
    let entry = engine
        .post(PostRequest::sale(&cat, &item, 1, 2990, "cash"))
        .await
        .unwrap();

    let corrected = engine.adjust(&entry.id, 299).await.unwrap();
    assert_eq!(corrected.amount_cents, 299);

    // Inventory untouched, summary reflects the corrected amount
    assert_eq!(query.item_quantity(&item).await.unwrap(), 9);
    assert_eq!(projector.summary(&cat).await.unwrap().revenue_cents, 299);

    // The superseded value is reconstructible
    let revisions = query.revisions(&entry.id).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].old_amount_cents, 2990);
    assert_eq!(revisions[0].new_amount_cents, 299);
}

#[tokio::test]
async fn adjust_to_same_amount_leaves_no_revision() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 1, 299, "cash"))
        .await
        .unwrap();
    engine.adjust(&entry.id, 299).await.unwrap();

    assert!(query.revisions(&entry.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn adjust_validates_amount_and_existence() {
    let (db, engine, _, _) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let entry = engine
        .post(PostRequest::sale(&cat, &item, 1, 299, "cash"))
        .await
        .unwrap();

    let err = engine.adjust(&entry.id, 0).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount { .. }));

    let err = engine.adjust("no-such-entry", 100).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));

    // Reversal is terminal: no adjust afterwards
    engine.reverse(&entry.id).await.unwrap();
    let err = engine.adjust(&entry.id, 100).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn post_with_request_id_replays_instead_of_double_posting() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 0).await;
    let item = seed_item(&db, &cat, "COKE-330", 10).await;

    let request = PostRequest::sale(&cat, &item, 2, 598, "cash").request_id("pos-7-000123");

    let first = engine.post(request.clone()).await.unwrap();
    let replay = engine.post(request).await.unwrap();

    assert_eq!(first.id, replay.id);
    assert_eq!(query.item_quantity(&item).await.unwrap(), 8, "stock moved once");

    let listed = query.list_entries(&LedgerFilter::for_category(&cat)).await.unwrap();
    assert_eq!(listed.len(), 1, "one entry despite the retry");
}

// =============================================================================
// Archive Listing
// =============================================================================

#[tokio::test]
async fn listing_filters_by_kind_and_pages() {
    let (db, engine, _, query) = setup().await;
    let cat = seed_category(&db, "Beverages", 1000_00).await;
    let item = seed_item(&db, &cat, "COKE-330", 50).await;

    for _ in 0..3 {
        engine
            .post(PostRequest::sale(&cat, &item, 1, 100_00, "cash"))
            .await
            .unwrap();
    }
    engine
        .post(PostRequest::expense(&cat, 30_00, "supplier"))
        .await
        .unwrap();

    let sales = query
        .list_entries(&LedgerFilter::for_category(&cat).kind(TransactionKind::Sale))
        .await
        .unwrap();
    assert_eq!(sales.len(), 3);
    assert!(sales.iter().all(|e| e.kind == TransactionKind::Sale));

    // Restartable pagination: two pages cover the whole archive
    let page1 = query
        .list_entries(&LedgerFilter::for_category(&cat).page(2, 0))
        .await
        .unwrap();
    let page2 = query
        .list_entries(&LedgerFilter::for_category(&cat).page(2, 2))
        .await
        .unwrap();
    assert_eq!(page1.len(), 2);
    assert_eq!(page2.len(), 2);
    let mut seen: Vec<_> = page1.iter().chain(page2.iter()).map(|e| e.id.clone()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 4);
}

// =============================================================================
// Invariant: quantity never goes negative
// =============================================================================

mod quantity_invariant {
    use super::*;
    use proptest::prelude::*;

    /// One step of a random workload against a single item.
    #[derive(Debug, Clone)]
    enum Op {
        /// Try to sell this many units (may legitimately fail short).
        Sale(i64),
        /// Reverse the n-th still-open sale, if any.
        Reverse(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..=4).prop_map(Op::Sale),
            (0usize..8).prop_map(Op::Reverse),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 24,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of posts and reversals ever drives the
        /// on-hand quantity negative, and the shelf count always equals
        /// initial - units sold by open entries.
        #[test]
        fn random_post_reverse_sequences_hold_the_floor(
            initial in 0i64..10,
            ops in prop::collection::vec(op_strategy(), 1..25)
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let (db, engine, _, query) = setup().await;
                let cat = seed_category(&db, "Beverages", 0).await;
                let item = seed_item(&db, &cat, "PROP-1", initial).await;

                let mut open_sales: Vec<(String, i64)> = Vec::new();
                let mut expected = initial;

                for op in ops {
                    match op {
                        Op::Sale(quantity) => {
                            match engine
                                .post(PostRequest::sale(&cat, &item, quantity, quantity * 299, "cash"))
                                .await
                            {
                                Ok(entry) => {
                                    open_sales.push((entry.id, quantity));
                                    expected -= quantity;
                                }
                                Err(LedgerError::InsufficientStock { available, .. }) => {
                                    // The refusal must be justified
                                    assert!(available < quantity);
                                }
                                Err(other) => panic!("unexpected error: {other:?}"),
                            }
                        }
                        Op::Reverse(index) => {
                            if open_sales.is_empty() {
                                continue;
                            }
                            let (entry_id, quantity) = open_sales.remove(index % open_sales.len());
                            engine.reverse(&entry_id).await.unwrap();
                            expected += quantity;
                        }
                    }

                    let quantity = query.item_quantity(&item).await.unwrap();
                    assert!(quantity >= 0, "quantity went negative: {quantity}");
                    assert_eq!(quantity, expected);
                }
            });
        }
    }
}
