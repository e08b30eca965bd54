use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{info, warn};

use crate::{
    app_error::AppError,
    app_state::AppState,
    db,
    domain::{
        checkout::{self, CheckoutLine, StockLevel},
        fulfillment::{OrderStatus, SubOrderStatus},
        prescription,
    },
    models::{
        CreateOrderEntity, CreateSubOrderEntity, OrderEntity, SubOrderEntity, SubOrderItemEntity,
    },
    schema::{cart_items, medicines, orders, prescriptions, stock, sub_order_items, sub_orders},
    services::{
        carts,
        orders::{OrderView, SubOrderView},
    },
};

/// Locks the stock rows behind `lines` in (pharmacy, medicine) order.
async fn lock_stock(
    conn: &mut AsyncPgConnection,
    lines: &[CheckoutLine],
) -> Result<HashMap<(i32, i32), StockLevel>, AppError> {
    let mut keys: Vec<(i32, i32)> = lines.iter().map(|l| (l.pharmacy_id, l.medicine_id)).collect();
    keys.sort_unstable();
    keys.dedup();

    let mut levels = HashMap::with_capacity(keys.len());
    for (pharmacy_id, medicine_id) in keys {
        let row: Option<(i32, bigdecimal::BigDecimal)> = stock::table
            .find((pharmacy_id, medicine_id))
            .select((stock::quantity, stock::unit_price))
            .for_update()
            .first(conn)
            .await
            .optional()?;

        if let Some((quantity, unit_price)) = row {
            levels.insert((pharmacy_id, medicine_id), StockLevel { quantity, unit_price });
        }
    }
    Ok(levels)
}

/// Converts the customer's cart into an order with one sub-order per
/// assigned pharmacy. Stock is decremented and the cart emptied in the same
/// transaction; any failure leaves everything untouched.
pub async fn checkout(state: &AppState, customer_id: i32) -> Result<OrderView, AppError> {
    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let result = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;

                let cart = carts::lock_cart(conn, customer_id).await?;

                let rows: Vec<(i32, i32, i32, bool)> = cart_items::table
                    .inner_join(medicines::table)
                    .filter(cart_items::cart_id.eq(cart.id))
                    .order_by((cart_items::assigned_pharmacy_id.asc(), cart_items::medicine_id.asc()))
                    .select((
                        cart_items::medicine_id,
                        cart_items::assigned_pharmacy_id,
                        cart_items::quantity,
                        medicines::prescription_required,
                    ))
                    .load(conn)
                    .await?;

                if rows.is_empty() {
                    return Err(AppError::EmptyCart);
                }

                let requires_prescription = rows.iter().any(|(_, _, _, required)| *required);
                let status = prescription::parse_column(cart.prescription_status.as_deref())?;
                if !prescription::checkout_allowed(requires_prescription, status) {
                    return Err(AppError::PrescriptionPending);
                }

                let lines: Vec<CheckoutLine> = rows
                    .into_iter()
                    .map(|(medicine_id, pharmacy_id, quantity, _)| CheckoutLine {
                        medicine_id,
                        pharmacy_id,
                        quantity,
                    })
                    .collect();

                let levels = lock_stock(conn, &lines).await?;
                let plan = checkout::plan_checkout(&lines, &levels)?;

                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        customer_id,
                        cart_id: cart.id,
                        total_amount: plan.total_amount.clone(),
                        final_status: OrderStatus::Processing.as_str().into(),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let mut views = Vec::with_capacity(plan.sub_orders.len());
                for planned in plan.sub_orders {
                    let sub_order: SubOrderEntity = diesel::insert_into(sub_orders::table)
                        .values(CreateSubOrderEntity {
                            order_id: order.id,
                            pharmacy_id: planned.pharmacy_id,
                            status: SubOrderStatus::Processing.as_str().into(),
                            sub_total: planned.sub_total.clone(),
                        })
                        .returning(SubOrderEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    let items: Vec<SubOrderItemEntity> = planned
                        .items
                        .into_iter()
                        .map(|item| SubOrderItemEntity {
                            sub_order_id: sub_order.id,
                            medicine_id: item.medicine_id,
                            quantity: item.quantity,
                            unit_price: item.unit_price,
                            line_total: item.line_total,
                        })
                        .collect();

                    diesel::insert_into(sub_order_items::table)
                        .values(&items)
                        .execute(conn)
                        .await?;

                    for item in &items {
                        diesel::update(stock::table.find((planned.pharmacy_id, item.medicine_id)))
                            .set((
                                stock::quantity.eq(stock::quantity - item.quantity),
                                stock::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    views.push(SubOrderView { sub_order, items });
                }

                // Prescriptions only travel with orders that needed one. Any
                // other upload stays open for the cart's next order.
                let (attached, kept_status) = if requires_prescription {
                    let attached = diesel::update(
                        prescriptions::table
                            .filter(prescriptions::cart_id.eq(cart.id))
                            .filter(prescriptions::order_id.is_null()),
                    )
                    .set(prescriptions::order_id.eq(order.id))
                    .execute(conn)
                    .await?;
                    (attached, None)
                } else {
                    (0, status)
                };

                carts::clear_cart(conn, cart.id, kept_status).await?;

                Ok::<(OrderView, usize), AppError>((
                    OrderView {
                        order,
                        sub_orders: views,
                    },
                    attached,
                ))
            })
        })
        .await;

    match result {
        Ok((view, attached)) => {
            info!(
                "Customer #{} checked out order #{} with {} sub-orders (total {}, {} prescriptions attached)",
                customer_id,
                view.order.id,
                view.sub_orders.len(),
                view.order.total_amount,
                attached
            );
            Ok(view)
        }
        Err(err) => {
            if matches!(err, AppError::StockConflict(_)) {
                warn!("Checkout for customer #{} aborted: {}", customer_id, err);
            }
            Err(err)
        }
    }
}
