//! Sale checkout, edit and void against real stock.

mod common;

use common::{units, Fixture};
use kardex_core::{
    Cart, CheckoutLine, CheckoutRequest, ClientType, CoreError, EditLine, Money, MoveType,
    NewClient, PaymentMethod, PriceTier, Quantity, SaleEdit, SyncAction, SyncEntity,
};
use kardex_db::DbError;

fn request(fx: &Fixture, lines: Vec<CheckoutLine>) -> CheckoutRequest {
    CheckoutRequest {
        company_id: fx.company_id,
        branch_id: fx.branch.id,
        client_id: None,
        price_tier: PriceTier::Retail,
        payment_method: PaymentMethod::Cash,
        lines,
    }
}

fn sell(product_id: i64, qty: i64, cents: i64) -> CheckoutLine {
    CheckoutLine {
        product_id,
        qty: units(qty),
        unit_price: Money::from_cents(cents),
    }
}

fn keep(product_id: i64, qty: i64) -> EditLine {
    EditLine {
        product_id,
        qty: units(qty),
        unit_price: None,
    }
}

#[tokio::test]
async fn test_checkout_edit_and_void_round_trip_stock() {
    let fx = Fixture::new().await;
    let product = fx.product("Rice", "RICE", 250, 180).await;
    let shop = fx.branch.location();
    fx.stock(product.id, shop, 3).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(product.id, 2, 250)]))
        .await
        .unwrap();
    assert_eq!(fx.balance(product.id, shop).await, units(1));
    assert_eq!(sale.sale.subtotal, Money::from_cents(500));
    assert_eq!(sale.sale.total, Money::from_cents(500));
    assert_eq!(sale.items[0].unit_cost, Money::from_cents(180));
    assert_eq!(sale.profit(), Money::from_cents(140));

    let err = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(product.id, 5, 250)]))
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());
    assert_eq!(fx.balance(product.id, shop).await, units(1));

    let edited = fx
        .db
        .sales()
        .edit(
            fx.company_id,
            sale.sale.id,
            &SaleEdit {
                lines: vec![keep(product.id, 1)],
                payment_method: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(product.id, shop).await, units(2));
    assert_eq!(edited.quantity_of(product.id), units(1));
    assert_eq!(edited.sale.total, Money::from_cents(250));
    assert_eq!(fx.movement_count_of(MoveType::SaleEdit).await, 1);

    let voided = fx.db.sales().delete(fx.company_id, sale.sale.id).await.unwrap();
    assert_eq!(voided.sale.id, sale.sale.id);
    assert_eq!(fx.balance(product.id, shop).await, units(3));
    assert_eq!(fx.movement_count_of(MoveType::SaleVoid).await, 1);
    assert!(fx.db.sales().get(fx.company_id, sale.sale.id).await.unwrap().is_none());

    let events = fx
        .db
        .sync_events()
        .for_entity(fx.company_id, SyncEntity::Sale, sale.sale.id)
        .await
        .unwrap();
    let actions: Vec<SyncAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![SyncAction::Create, SyncAction::Update, SyncAction::Delete]
    );

    fx.assert_ledger_consistent().await;
}

#[tokio::test]
async fn test_short_line_rolls_back_whole_checkout() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let oil = fx.product("Oil", "OIL", 520, 390).await;
    let shop = fx.branch.location();
    fx.stock(rice.id, shop, 10).await;
    fx.stock(oil.id, shop, 1).await;

    let err = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 4, 250), sell(oil.id, 2, 520)]))
        .await
        .unwrap_err();
    match err {
        DbError::Domain(CoreError::InsufficientStock {
            product_id,
            available,
            ..
        }) => {
            assert_eq!(product_id, oil.id);
            assert_eq!(available, units(1));
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(fx.balance(rice.id, shop).await, units(10));
    assert_eq!(fx.movement_count_of(MoveType::SaleOut).await, 0);
    assert!(fx
        .db
        .sales()
        .list_recent(fx.company_id, None, 10)
        .await
        .unwrap()
        .is_empty());
    assert!(fx.db.sync_events().get_pending(fx.company_id, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_rejects_bad_requests() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    fx.stock(rice.id, fx.branch.location(), 10).await;
    let sales = fx.db.sales();

    let err = sales.checkout(&request(&fx, vec![])).await.unwrap_err();
    assert!(err.is_validation());

    let err = sales
        .checkout(&request(&fx, vec![sell(rice.id, 1, 250), sell(rice.id, 2, 250)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::DuplicateLine { .. })));

    let err = sales
        .checkout(&request(&fx, vec![sell(rice.id, 0, 250)]))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let mut wrong_branch = request(&fx, vec![sell(rice.id, 1, 250)]);
    wrong_branch.branch_id = 777;
    let err = sales.checkout(&wrong_branch).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::BranchNotFound(777))));

    let client = fx
        .db
        .clients()
        .insert(&NewClient {
            company_id: fx.company_id,
            full_name: "Maria Lopez".to_string(),
            phone: None,
            email: None,
            client_type: ClientType::Wholesale,
        })
        .await
        .unwrap();
    fx.db
        .clients()
        .set_active(fx.company_id, client.id, false)
        .await
        .unwrap();
    let mut with_client = request(&fx, vec![sell(rice.id, 1, 250)]);
    with_client.client_id = Some(client.id);
    let err = sales.checkout(&with_client).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::ClientNotFound(_))));

    assert_eq!(fx.balance(rice.id, fx.branch.location()).await, units(10));
}

#[tokio::test]
async fn test_sale_keeps_cost_from_checkout_time() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    fx.stock(rice.id, fx.branch.location(), 5).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 2, 250)]))
        .await
        .unwrap();

    fx.db
        .products()
        .update_prices(
            fx.company_id,
            rice.id,
            Money::from_cents(300),
            Money::from_cents(270),
            Money::from_cents(0),
            Money::from_cents(220),
        )
        .await
        .unwrap();

    let reloaded = fx
        .db
        .sales()
        .get(fx.company_id, sale.sale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.items[0].unit_cost, Money::from_cents(180));
    assert_eq!(reloaded.items[0].unit_price, Money::from_cents(250));
}

#[tokio::test]
async fn test_edit_increase_remove_and_add_lines() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let beans = fx.product("Beans", "BEAN", 180, 120).await;
    let oil = fx.product("Oil", "OIL", 520, 390).await;
    let shop = fx.branch.location();
    for p in [&rice, &beans, &oil] {
        fx.stock(p.id, shop, 10).await;
    }

    let cart_request = {
        let mut cart = Cart::new();
        cart.add_item(&rice, units(2)).unwrap();
        cart.add_item(&beans, units(1)).unwrap();
        cart.to_checkout(fx.company_id, fx.branch.id, PaymentMethod::Cash)
            .unwrap()
    };
    let sale = fx.db.sales().checkout(&cart_request).await.unwrap();
    assert_eq!(sale.sale.total, Money::from_cents(680));

    let edit = SaleEdit {
        lines: vec![
            keep(rice.id, 3),
            EditLine {
                product_id: oil.id,
                qty: Quantity::normalize("1"),
                unit_price: None,
            },
        ],
        payment_method: Some(PaymentMethod::Transfer),
    };
    let edited = fx
        .db
        .sales()
        .edit(fx.company_id, sale.sale.id, &edit)
        .await
        .unwrap();

    assert_eq!(edited.items.len(), 2);
    assert_eq!(edited.quantity_of(rice.id), units(3));
    assert_eq!(edited.quantity_of(beans.id), Quantity::ZERO);
    assert_eq!(edited.quantity_of(oil.id), units(1));
    // 3 x 2.50 + 1 x 5.20 at the retail tier
    assert_eq!(edited.sale.subtotal, Money::from_cents(1270));
    assert_eq!(edited.sale.total, Money::from_cents(1270));
    assert_eq!(edited.sale.payment_method, PaymentMethod::Transfer);

    let oil_item = edited.items.iter().find(|i| i.product_id == oil.id).unwrap();
    assert_eq!(oil_item.unit_cost, Money::from_cents(390));

    assert_eq!(fx.balance(rice.id, shop).await, units(7));
    assert_eq!(fx.balance(beans.id, shop).await, units(10));
    assert_eq!(fx.balance(oil.id, shop).await, units(9));
    assert_eq!(fx.movement_count_of(MoveType::SaleEdit).await, 3);

    // Applying the same line set again changes nothing.
    let again = fx
        .db
        .sales()
        .edit(fx.company_id, sale.sale.id, &edit)
        .await
        .unwrap();
    assert_eq!(again.sale.total, edited.sale.total);
    assert_eq!(fx.movement_count_of(MoveType::SaleEdit).await, 3);
    assert_eq!(fx.balance(rice.id, shop).await, units(7));

    fx.assert_ledger_consistent().await;
}

#[tokio::test]
async fn test_edit_with_explicit_price_rewrites_line() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    fx.stock(rice.id, fx.branch.location(), 5).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 2, 250)]))
        .await
        .unwrap();
    let edited = fx
        .db
        .sales()
        .edit(
            fx.company_id,
            sale.sale.id,
            &SaleEdit {
                lines: vec![EditLine {
                    product_id: rice.id,
                    qty: units(2),
                    unit_price: Some(Money::from_cents(200)),
                }],
                payment_method: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.items[0].unit_price, Money::from_cents(200));
    assert_eq!(edited.sale.total, Money::from_cents(400));
    assert_eq!(fx.movement_count_of(MoveType::SaleEdit).await, 0);
}

#[tokio::test]
async fn test_failed_edit_leaves_sale_untouched() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let beans = fx.product("Beans", "BEAN", 180, 120).await;
    let shop = fx.branch.location();
    fx.stock(rice.id, shop, 3).await;
    fx.stock(beans.id, shop, 3).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 2, 250), sell(beans.id, 1, 180)]))
        .await
        .unwrap();

    // Beans drop to zero first, then rice asks for 5 more than the shelf has.
    let err = fx
        .db
        .sales()
        .edit(
            fx.company_id,
            sale.sale.id,
            &SaleEdit {
                lines: vec![keep(beans.id, 0), keep(rice.id, 8)],
                payment_method: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());

    let reloaded = fx
        .db
        .sales()
        .get(fx.company_id, sale.sale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.items.len(), 2);
    assert_eq!(reloaded.sale.total, sale.sale.total);
    assert_eq!(fx.balance(rice.id, shop).await, units(1));
    assert_eq!(fx.balance(beans.id, shop).await, units(2));
    assert_eq!(fx.movement_count_of(MoveType::SaleEdit).await, 0);

    let err = fx
        .db
        .sales()
        .edit(
            fx.company_id,
            sale.sale.id,
            &SaleEdit {
                lines: vec![],
                payment_method: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::EmptyDocument { .. })));

    let err = fx
        .db
        .sales()
        .edit(fx.company_id, 999, &SaleEdit::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(999))));
}

#[tokio::test]
async fn test_list_recent_filters_by_branch() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    fx.stock(rice.id, fx.branch.location(), 5).await;
    fx.stock(rice.id, fx.other_branch.location(), 5).await;

    let here = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 1, 250)]))
        .await
        .unwrap();
    let mut elsewhere = request(&fx, vec![sell(rice.id, 1, 250)]);
    elsewhere.branch_id = fx.other_branch.id;
    let there = fx.db.sales().checkout(&elsewhere).await.unwrap();

    let all = fx.db.sales().list_recent(fx.company_id, None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, there.sale.id);

    let downtown = fx
        .db
        .sales()
        .list_recent(fx.company_id, Some(fx.branch.id), 10)
        .await
        .unwrap();
    assert_eq!(downtown.len(), 1);
    assert_eq!(downtown[0].id, here.sale.id);
}

#[tokio::test]
async fn test_checkout_composes_with_caller_transaction() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let shop = fx.branch.location();
    fx.stock(rice.id, shop, 5).await;

    let mut tx = fx.db.begin().await.unwrap();
    let doc = kardex_db::repository::sale::checkout_in(&mut tx, &request(&fx, vec![sell(rice.id, 2, 250)]))
        .await
        .unwrap();
    assert_eq!(doc.items.len(), 1);
    tx.rollback().await.unwrap();

    assert_eq!(fx.balance(rice.id, shop).await, units(5));
    assert!(fx.db.sales().get(fx.company_id, doc.sale.id).await.unwrap().is_none());
    assert_eq!(fx.movement_count_of(MoveType::SaleOut).await, 0);
}

/// Eight registers sell different products at the same time on a file
/// database. Every checkout reads before it writes, so none of them may
/// lose its lock upgrade to another register's commit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_of_different_products_all_succeed() {
    const REGISTERS: i64 = 8;
    const ROUNDS: i64 = 20;

    let fx = Fixture::on_disk(REGISTERS as u32).await;
    let shop = fx.branch.location();

    let mut products = Vec::new();
    for n in 0..REGISTERS {
        let product = fx.product(&format!("Item {n}"), &format!("SKU-{n}"), 100, 60).await;
        fx.stock(product.id, shop, ROUNDS).await;
        products.push(product.id);
    }

    let mut handles = Vec::new();
    for &product_id in &products {
        let db = fx.db.clone();
        let req = request(&fx, vec![sell(product_id, 1, 100)]);
        handles.push(tokio::spawn(async move {
            for _ in 0..ROUNDS {
                db.sales().checkout(&req).await?;
            }
            Ok::<_, DbError>(())
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for product_id in products {
        assert_eq!(fx.balance(product_id, shop).await, Quantity::ZERO);
    }
    assert_eq!(fx.movement_count_of(MoveType::SaleOut).await, REGISTERS * ROUNDS);
    fx.assert_ledger_consistent().await;
    fx.remove().await;
}

#[tokio::test]
async fn test_edit_and_void_return_stock_to_deactivated_branch() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let shop = fx.branch.location();
    fx.stock(rice.id, shop, 5).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 4, 250)]))
        .await
        .unwrap();
    assert_eq!(fx.balance(rice.id, shop).await, units(1));

    let closed = fx
        .db
        .branches()
        .toggle_active(fx.company_id, fx.branch.id)
        .await
        .unwrap();
    assert!(!closed.is_active);

    fx.db
        .sales()
        .edit(
            fx.company_id,
            sale.sale.id,
            &SaleEdit {
                lines: vec![keep(rice.id, 1)],
                payment_method: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(fx.balance(rice.id, shop).await, units(4));

    fx.db.sales().delete(fx.company_id, sale.sale.id).await.unwrap();
    assert_eq!(fx.balance(rice.id, shop).await, units(5));

    // Nothing leaked to the warehouse or the other branch.
    assert_eq!(fx.balance(rice.id, fx.warehouse.location()).await, Quantity::ZERO);
    assert_eq!(fx.balance(rice.id, fx.other_branch.location()).await, Quantity::ZERO);
    fx.assert_ledger_consistent().await;
}

#[tokio::test]
async fn test_void_inside_rolled_back_caller_transaction_keeps_sale() {
    let fx = Fixture::new().await;
    let rice = fx.product("Rice", "RICE", 250, 180).await;
    let beans = fx.product("Beans", "BEAN", 180, 120).await;
    let shop = fx.branch.location();
    fx.stock(rice.id, shop, 5).await;
    fx.stock(beans.id, shop, 5).await;

    let sale = fx
        .db
        .sales()
        .checkout(&request(&fx, vec![sell(rice.id, 2, 250), sell(beans.id, 3, 180)]))
        .await
        .unwrap();

    let mut tx = fx.db.begin().await.unwrap();
    let voided = kardex_db::repository::sale::delete_in(&mut tx, fx.company_id, sale.sale.id)
        .await
        .unwrap();
    assert_eq!(voided.items.len(), 2);
    tx.rollback().await.unwrap();

    let kept = fx
        .db
        .sales()
        .get(fx.company_id, sale.sale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.items.len(), 2);
    assert_eq!(kept.quantity_of(rice.id), units(2));
    assert_eq!(kept.quantity_of(beans.id), units(3));
    assert_eq!(kept.sale.total, sale.sale.total);

    assert_eq!(fx.balance(rice.id, shop).await, units(3));
    assert_eq!(fx.balance(beans.id, shop).await, units(2));
    assert_eq!(fx.movement_count_of(MoveType::SaleVoid).await, 0);

    let events = fx
        .db
        .sync_events()
        .for_entity(fx.company_id, SyncEntity::Sale, sale.sale.id)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, SyncAction::Create);
}
