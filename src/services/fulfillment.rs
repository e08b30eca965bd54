use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    app_state::AppState,
    db,
    domain::fulfillment::{self, Actor, OrderStatus, SubOrderState, SubOrderStatus},
    models::{OrderEntity, SubOrderEntity, SubOrderItemEntity},
    schema::{delivery_agents, orders, stock, sub_order_items, sub_orders},
    services::orders::SubOrderView,
};

#[derive(Serialize, ToSchema, Debug)]
pub struct TransitionOutcome {
    pub sub_order: SubOrderView,
    pub order_status: OrderStatus,
}

/// Moves sub-order `sub_order_id` of order `order_id` to `next`. The order
/// row is locked first so concurrent transitions on sibling sub-orders
/// recompute the order status one after another.
pub async fn transition(
    state: &AppState,
    actor: Actor,
    order_id: i32,
    sub_order_id: i32,
    next: SubOrderStatus,
    bind_agent: Option<i32>,
) -> Result<TransitionOutcome, AppError> {
    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let (outcome, previous) = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;

                let order: OrderEntity = orders::table
                    .find(order_id)
                    .select(OrderEntity::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::NotFound(format!("Order #{} not found", order_id)))?;

                let sub_order: SubOrderEntity = sub_orders::table
                    .find(sub_order_id)
                    .filter(sub_orders::order_id.eq(order.id))
                    .select(SubOrderEntity::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "Sub-order #{} not found in order #{}",
                            sub_order_id, order_id
                        ))
                    })?;

                let previous: SubOrderStatus = sub_order.status.parse()?;
                fulfillment::check_transition(
                    &SubOrderState {
                        id: sub_order.id,
                        status: previous,
                        pharmacy_id: sub_order.pharmacy_id,
                        agent_id: sub_order.agent_id,
                    },
                    next,
                    actor,
                    bind_agent,
                )?;

                if let Some(agent_id) = bind_agent {
                    let agents_found: i64 = delivery_agents::table
                        .find(agent_id)
                        .count()
                        .get_result(conn)
                        .await?;
                    if agents_found == 0 {
                        return Err(AppError::NotFound(format!(
                            "Delivery agent #{} not found",
                            agent_id
                        )));
                    }
                }

                let updated: SubOrderEntity = diesel::update(sub_orders::table.find(sub_order.id))
                    .set((
                        sub_orders::status.eq(next.as_str()),
                        sub_orders::agent_id.eq(bind_agent.or(sub_order.agent_id)),
                        sub_orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(SubOrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let items: Vec<SubOrderItemEntity> = sub_order_items::table
                    .filter(sub_order_items::sub_order_id.eq(updated.id))
                    .order_by(sub_order_items::medicine_id.asc())
                    .select(SubOrderItemEntity::as_select())
                    .load(conn)
                    .await?;

                if next == SubOrderStatus::Cancelled {
                    for item in &items {
                        diesel::update(stock::table.find((updated.pharmacy_id, item.medicine_id)))
                            .set((
                                stock::quantity.eq(stock::quantity + item.quantity),
                                stock::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await?;
                    }
                }

                let statuses = sub_orders::table
                    .filter(sub_orders::order_id.eq(order.id))
                    .select(sub_orders::status)
                    .load::<String>(conn)
                    .await?
                    .iter()
                    .map(|status| status.parse::<SubOrderStatus>())
                    .collect::<Result<Vec<_>, _>>()?;
                let order_status = OrderStatus::aggregate(&statuses);

                diesel::update(orders::table.find(order.id))
                    .set((
                        orders::final_status.eq(order_status.as_str()),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;

                Ok::<(TransitionOutcome, SubOrderStatus), AppError>((
                    TransitionOutcome {
                        sub_order: SubOrderView {
                            sub_order: updated,
                            items,
                        },
                        order_status,
                    },
                    previous,
                ))
            })
        })
        .await?;

    info!(
        "Sub-order #{} of order #{} moved {} -> {} by {:?} (order now {})",
        sub_order_id, order_id, previous, next, actor, outcome.order_status
    );
    Ok(outcome)
}
