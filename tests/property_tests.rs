//! Property-based tests for money arithmetic and order totals.
//!
//! The pure properties run against `services::pricing`; the stateful one
//! replays random item edits against an in-memory database and checks the
//! stored total after every step.

mod common;

use common::TestApp;
use marketplace_api::services::{
    order_items::{NewOrderItem, UpdateOrderItem},
    pricing,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn cents() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|c| Decimal::new(c, 2))
}

fn fractional_price() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|v| Decimal::new(v, 4))
}

proptest! {
    #[test]
    fn line_subtotals_are_cent_exact(quantity in 1i32..10_000, price in fractional_price()) {
        let subtotal = pricing::line_subtotal(quantity, price).unwrap();
        prop_assert!(subtotal.scale() <= pricing::MONEY_SCALE);
        prop_assert!(subtotal >= Decimal::ZERO);
        // Rounding never moves a line by more than half a cent.
        let exact = Decimal::from(quantity) * price;
        prop_assert!((subtotal - exact).abs() <= Decimal::new(5, 3));
    }

    #[test]
    fn order_total_is_independent_of_line_order(lines in prop::collection::vec(cents(), 0..40)) {
        let forward = pricing::order_total(lines.iter().copied()).unwrap();
        let backward = pricing::order_total(lines.iter().rev().copied()).unwrap();
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward, lines.iter().copied().sum::<Decimal>());
    }

    #[test]
    fn purchase_totals_add_transport_once(
        quantity in 1i32..1_000,
        unit_cost in cents(),
        transport in cents(),
    ) {
        let with = pricing::purchase_order_total(quantity, unit_cost, transport).unwrap();
        let without = pricing::purchase_order_total(quantity, unit_cost, Decimal::ZERO).unwrap();
        prop_assert_eq!(with - without, transport);
    }
}

#[derive(Debug, Clone)]
enum ItemOp {
    Add { quantity: i32, price: Decimal },
    Requantify { slot: usize, quantity: i32 },
    Reprice { slot: usize, price: Decimal },
    Remove { slot: usize },
}

fn item_op() -> impl Strategy<Value = ItemOp> {
    let price = (0i64..50_000).prop_map(|c| Decimal::new(c, 2));
    prop_oneof![
        (1i32..20, price.clone()).prop_map(|(quantity, price)| ItemOp::Add { quantity, price }),
        (any::<usize>(), 1i32..20)
            .prop_map(|(slot, quantity)| ItemOp::Requantify { slot, quantity }),
        (any::<usize>(), price).prop_map(|(slot, price)| ItemOp::Reprice { slot, price }),
        any::<usize>().prop_map(|slot| ItemOp::Remove { slot }),
    ]
}

/// Total recomputed from the local (item id, quantity, unit price) model.
fn expected_total(model: &[(i32, i32, Decimal)]) -> Result<Decimal, String> {
    let lines = model
        .iter()
        .map(|(_, quantity, price)| pricing::line_subtotal(*quantity, *price))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    pricing::order_total(lines).map_err(|e| e.to_string())
}

/// Applies `ops` through the item service and returns the first mismatch
/// between the stored total and the total recomputed from the local model.
async fn replay(ops: Vec<ItemOp>) -> Result<(), String> {
    let app = TestApp::new().await;
    let provider = app.signup("provider", "acme-labs").await;
    let dealer = app.signup("dealer", "corner-shop").await;
    let customer = app.signup("customer", "alice").await;
    let substance = app.seed_substance(&provider, "Ethanol", "1.00").await;
    let order_id = app.seed_order(&customer, &dealer, substance, 1, "1.00").await;

    let service = app.state.services.order_items.clone();
    let seeded = app
        .state
        .services
        .orders
        .items(order_id)
        .await
        .map_err(|e| e.to_string())?;
    // (item id, quantity, unit price)
    let mut model: Vec<(i32, i32, Decimal)> = seeded
        .iter()
        .map(|item| (item.id, item.quantity, Decimal::new(100, 2)))
        .collect();

    for op in ops {
        let change = match op {
            ItemOp::Add { quantity, price } => {
                let change = service
                    .create(NewOrderItem {
                        order_id,
                        substance_id: substance,
                        quantity,
                        unit_price: price,
                    })
                    .await
                    .map_err(|e| e.to_string())?;
                let id = change.item.as_ref().map(|item| item.id).ok_or("no item")?;
                model.push((id, quantity, price));
                change
            }
            ItemOp::Requantify { slot, quantity } if !model.is_empty() => {
                let slot = slot % model.len();
                model[slot].1 = quantity;
                service
                    .update(
                        model[slot].0,
                        UpdateOrderItem {
                            quantity: Some(quantity),
                            unit_price: None,
                        },
                    )
                    .await
                    .map_err(|e| e.to_string())?
            }
            ItemOp::Reprice { slot, price } if !model.is_empty() => {
                let slot = slot % model.len();
                model[slot].2 = price;
                service
                    .update(
                        model[slot].0,
                        UpdateOrderItem {
                            quantity: None,
                            unit_price: Some(price),
                        },
                    )
                    .await
                    .map_err(|e| e.to_string())?
            }
            ItemOp::Remove { slot } if !model.is_empty() => {
                let (id, _, _) = model.remove(slot % model.len());
                service.delete(id).await.map_err(|e| e.to_string())?
            }
            _ => continue,
        };

        let expected = expected_total(&model)?;
        if change.order_total != expected {
            return Err(format!("total {} != {}", change.order_total, expected));
        }
    }

    let stored = app
        .state
        .services
        .orders
        .get(order_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("order vanished")?;
    let expected = expected_total(&model)?;
    // SQLite hands decimals back through a float column.
    let stored_total = pricing::round_money(stored.total_amount);
    if stored_total != expected {
        return Err(format!("stored {} != {}", stored_total, expected));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn stored_total_matches_recomputed_lines(ops in prop::collection::vec(item_op(), 1..15)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime.block_on(replay(ops));
        prop_assert!(outcome.is_ok(), "{:?}", outcome);
    }
}
