use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    app_state::AppState,
    models::{OrderEntity, SubOrderEntity, SubOrderItemEntity},
    schema::{orders, sub_order_items, sub_orders},
};

#[derive(Serialize, ToSchema, Debug)]
pub struct SubOrderView {
    pub sub_order: SubOrderEntity,
    pub items: Vec<SubOrderItemEntity>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct OrderView {
    pub order: OrderEntity,
    pub sub_orders: Vec<SubOrderView>,
}

/// Attaches the line items to each sub-order, keeping the input order.
async fn with_items(
    conn: &mut AsyncPgConnection,
    sub_orders: Vec<SubOrderEntity>,
) -> Result<Vec<SubOrderView>, AppError> {
    let ids: Vec<i32> = sub_orders.iter().map(|sub| sub.id).collect();

    let items: Vec<SubOrderItemEntity> = sub_order_items::table
        .filter(sub_order_items::sub_order_id.eq_any(&ids))
        .order_by((sub_order_items::sub_order_id.asc(), sub_order_items::medicine_id.asc()))
        .select(SubOrderItemEntity::as_select())
        .load(conn)
        .await?;

    let mut grouped: HashMap<i32, Vec<SubOrderItemEntity>> = HashMap::new();
    for item in items {
        grouped.entry(item.sub_order_id).or_default().push(item);
    }

    Ok(sub_orders
        .into_iter()
        .map(|sub_order| SubOrderView {
            items: grouped.remove(&sub_order.id).unwrap_or_default(),
            sub_order,
        })
        .collect())
}

async fn assemble(
    conn: &mut AsyncPgConnection,
    orders: Vec<OrderEntity>,
) -> Result<Vec<OrderView>, AppError> {
    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();

    let subs: Vec<SubOrderEntity> = sub_orders::table
        .filter(sub_orders::order_id.eq_any(&order_ids))
        .order_by((sub_orders::order_id.asc(), sub_orders::pharmacy_id.asc()))
        .select(SubOrderEntity::as_select())
        .load(conn)
        .await?;

    let mut grouped: HashMap<i32, Vec<SubOrderView>> = HashMap::new();
    for view in with_items(conn, subs).await? {
        grouped.entry(view.sub_order.order_id).or_default().push(view);
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderView {
            sub_orders: grouped.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

/// Newest first.
pub async fn list_customer_orders(
    state: &AppState,
    customer_id: i32,
) -> Result<Vec<OrderView>, AppError> {
    let conn = &mut state.conn().await?;

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::customer_id.eq(customer_id))
        .order_by(orders::id.desc())
        .select(OrderEntity::as_select())
        .load(conn)
        .await?;

    assemble(conn, orders).await
}

pub async fn get_customer_order(
    state: &AppState,
    customer_id: i32,
    order_id: i32,
) -> Result<OrderView, AppError> {
    let conn = &mut state.conn().await?;

    let order: OrderEntity = orders::table
        .find(order_id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Order #{} not found", order_id)))?;

    if order.customer_id != customer_id {
        return Err(AppError::NotOwner(format!(
            "Order #{} belongs to another customer",
            order_id
        )));
    }

    assemble(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("Order #{} not found", order_id)))
}

/// Sub-orders fulfilled by `pharmacy_id`, optionally narrowed to one status.
pub async fn list_pharmacy_sub_orders(
    state: &AppState,
    pharmacy_id: i32,
    status: Option<&str>,
) -> Result<Vec<SubOrderView>, AppError> {
    let conn = &mut state.conn().await?;

    let mut query = sub_orders::table
        .filter(sub_orders::pharmacy_id.eq(pharmacy_id))
        .order_by(sub_orders::id.desc())
        .select(SubOrderEntity::as_select())
        .into_boxed();
    if let Some(status) = status {
        query = query.filter(sub_orders::status.eq(status.to_owned()));
    }

    let subs = query.load(conn).await?;
    with_items(conn, subs).await
}

pub async fn list_agent_sub_orders(
    state: &AppState,
    agent_id: i32,
) -> Result<Vec<SubOrderView>, AppError> {
    let conn = &mut state.conn().await?;

    let subs: Vec<SubOrderEntity> = sub_orders::table
        .filter(sub_orders::agent_id.eq(agent_id))
        .order_by(sub_orders::id.desc())
        .select(SubOrderEntity::as_select())
        .load(conn)
        .await?;

    with_items(conn, subs).await
}
