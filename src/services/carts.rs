use anyhow::anyhow;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    app_state::AppState,
    db,
    domain::{
        allocator::{AllocationRequest, StockCandidate},
        cart::{self, PricedLine},
        geo::GeoPoint,
        prescription::{self, PrescriptionStatus},
    },
    models::{CartEntity, CartItemEntity, CreateCartItemEntity},
    schema::{cart_items, carts, customers, medicines, pharmacies, stock},
    services::catalog,
};

#[derive(Serialize, ToSchema, Debug)]
pub struct CartLine {
    pub medicine_id: i32,
    pub medicine_name: String,
    pub prescription_required: bool,
    pub quantity: i32,
    pub assigned_pharmacy_id: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    #[schema(value_type = String)]
    pub item_total: BigDecimal,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct CartView {
    pub cart: CartEntity,
    pub items: Vec<CartLine>,
}

/// Locks and returns the cart of `customer_id`.
pub async fn lock_cart(conn: &mut AsyncPgConnection, customer_id: i32) -> Result<CartEntity, AppError> {
    carts::table
        .filter(carts::customer_id.eq(customer_id))
        .select(CartEntity::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Cart for customer #{} not found", customer_id)))
}

async fn load_lines(conn: &mut AsyncPgConnection, cart_id: i32) -> Result<Vec<CartLine>, AppError> {
    let rows: Vec<(CartItemEntity, String, bool)> = cart_items::table
        .inner_join(medicines::table)
        .filter(cart_items::cart_id.eq(cart_id))
        .order_by(cart_items::medicine_id.asc())
        .select((
            CartItemEntity::as_select(),
            medicines::name,
            medicines::prescription_required,
        ))
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(item, medicine_name, prescription_required)| CartLine {
            item_total: cart::line_total(item.quantity, &item.unit_price),
            medicine_id: item.medicine_id,
            medicine_name,
            prescription_required,
            quantity: item.quantity,
            assigned_pharmacy_id: item.assigned_pharmacy_id,
            unit_price: item.unit_price,
        })
        .collect())
}

/// Rewrites `total_amount` and `requires_prescription` from the current items.
async fn recompute_cart(
    conn: &mut AsyncPgConnection,
    cart_id: i32,
    prescription_status: Option<PrescriptionStatus>,
) -> Result<CartView, AppError> {
    let items = load_lines(conn, cart_id).await?;
    let totals = cart::compute_totals(
        &items
            .iter()
            .map(|line| PricedLine {
                quantity: line.quantity,
                unit_price: line.unit_price.clone(),
                prescription_required: line.prescription_required,
            })
            .collect::<Vec<_>>(),
    );

    let cart = diesel::update(carts::table.find(cart_id))
        .set((
            carts::total_amount.eq(&totals.total_amount),
            carts::requires_prescription.eq(totals.requires_prescription),
            carts::prescription_status.eq(prescription_status.map(|s| s.as_str())),
            carts::updated_at.eq(diesel::dsl::now),
        ))
        .returning(CartEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(CartView { cart, items })
}

/// Stock rows able to cover `quantity`, share-locked so a concurrent
/// checkout cannot drain them before the item is attached.
async fn load_candidates(
    conn: &mut AsyncPgConnection,
    medicine_id: i32,
    quantity: i32,
) -> Result<Vec<StockCandidate>, AppError> {
    let rows: Vec<(i32, i32, BigDecimal)> = stock::table
        .filter(stock::medicine_id.eq(medicine_id))
        .filter(stock::quantity.ge(quantity))
        .order_by(stock::pharmacy_id.asc())
        .select((stock::pharmacy_id, stock::quantity, stock::unit_price))
        .for_share()
        .load(conn)
        .await?;

    let pharmacy_ids: Vec<i32> = rows.iter().map(|(id, _, _)| *id).collect();
    let locations: Vec<(i32, Option<f64>, Option<f64>)> = pharmacies::table
        .filter(pharmacies::id.eq_any(&pharmacy_ids))
        .select((pharmacies::id, pharmacies::latitude, pharmacies::longitude))
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(pharmacy_id, quantity, unit_price)| StockCandidate {
            pharmacy_id,
            quantity,
            unit_price,
            location: locations
                .iter()
                .find(|(id, _, _)| *id == pharmacy_id)
                .and_then(|(_, lat, lon)| GeoPoint::from_columns(*lat, *lon)),
        })
        .collect())
}

pub async fn get_cart(state: &AppState, customer_id: i32) -> Result<CartView, AppError> {
    let conn = &mut state.conn().await?;

    let cart: CartEntity = carts::table
        .filter(carts::customer_id.eq(customer_id))
        .select(CartEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Cart for customer #{} not found", customer_id)))?;

    let items = load_lines(conn, cart.id).await?;
    Ok(CartView { cart, items })
}

/// Adds `quantity` units of a medicine to the customer's cart, assigning the
/// whole line to one pharmacy that can cover it.
pub async fn add_item(
    state: &AppState,
    customer_id: i32,
    medicine_id: i32,
    quantity: i32,
) -> Result<CartView, AppError> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than zero".into()));
    }

    let allocator = state.allocator.clone();
    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let view = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;

                let cart = lock_cart(conn, customer_id).await?;
                let medicine = catalog::get_medicine(conn, medicine_id).await?;

                let existing: Option<CartItemEntity> = cart_items::table
                    .find((cart.id, medicine_id))
                    .select(CartItemEntity::as_select())
                    .first(conn)
                    .await
                    .optional()?;

                let total_quantity = existing
                    .as_ref()
                    .map_or(0, |item| item.quantity)
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;

                let candidates = load_candidates(conn, medicine_id, total_quantity).await?;

                let (latitude, longitude): (Option<f64>, Option<f64>) = customers::table
                    .find(customer_id)
                    .select((customers::latitude, customers::longitude))
                    .first(conn)
                    .await?;

                let request = AllocationRequest {
                    medicine_id,
                    quantity: total_quantity,
                    customer_location: GeoPoint::from_columns(latitude, longitude),
                };

                let pharmacy_id = allocator.allocate(&request, &candidates).ok_or_else(|| {
                    AppError::InsufficientStock(format!(
                        "No pharmacy can supply {} units of {}",
                        total_quantity, medicine.name
                    ))
                })?;

                let chosen = candidates
                    .iter()
                    .find(|candidate| candidate.pharmacy_id == pharmacy_id)
                    .ok_or_else(|| {
                        AppError::Other(anyhow!(
                            "Allocator {} returned pharmacy #{} outside the candidate set",
                            allocator.name(),
                            pharmacy_id
                        ))
                    })?;

                debug!(
                    "Allocated {} units of medicine #{} to pharmacy #{} ({} candidates)",
                    total_quantity,
                    medicine_id,
                    pharmacy_id,
                    candidates.len()
                );

                let new_line_total = cart::line_total(total_quantity, &chosen.unit_price);
                let previous_line_total = existing.as_ref().map_or_else(
                    || BigDecimal::from(0),
                    |item| cart::line_total(item.quantity, &item.unit_price),
                );
                let projected_total = &cart.total_amount - previous_line_total + &new_line_total;
                if !cart::fits_money(&new_line_total) || !cart::fits_money(&projected_total) {
                    return Err(AppError::BadRequest(format!(
                        "{} units of {} would take the cart total past {}",
                        total_quantity,
                        medicine.name,
                        cart::max_amount()
                    )));
                }

                diesel::insert_into(cart_items::table)
                    .values(CreateCartItemEntity {
                        cart_id: cart.id,
                        medicine_id,
                        quantity: total_quantity,
                        assigned_pharmacy_id: pharmacy_id,
                        unit_price: chosen.unit_price.clone(),
                    })
                    .on_conflict((cart_items::cart_id, cart_items::medicine_id))
                    .do_update()
                    .set((
                        cart_items::quantity.eq(total_quantity),
                        cart_items::assigned_pharmacy_id.eq(pharmacy_id),
                        cart_items::unit_price.eq(&chosen.unit_price),
                        cart_items::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;

                let current_status =
                    prescription::parse_column(cart.prescription_status.as_deref())?;
                let status = cart::prescription_status_after_add(
                    current_status,
                    medicine.prescription_required,
                    existing.is_some(),
                );
                if current_status.is_some() && status.is_none() {
                    info!(
                        "Cart #{} needs a new prescription after adding medicine #{}",
                        cart.id, medicine_id
                    );
                }

                recompute_cart(conn, cart.id, status).await
            })
        })
        .await?;

    info!(
        "Customer #{} added {} units of medicine #{} (cart total {})",
        customer_id, quantity, medicine_id, view.cart.total_amount
    );

    Ok(view)
}

pub async fn remove_item(
    state: &AppState,
    customer_id: i32,
    medicine_id: i32,
) -> Result<CartView, AppError> {
    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let view = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;

                let cart = lock_cart(conn, customer_id).await?;

                let deleted = diesel::delete(cart_items::table.find((cart.id, medicine_id)))
                    .execute(conn)
                    .await?;
                if deleted == 0 {
                    return Err(AppError::NotFound(format!(
                        "Medicine #{} is not in the cart",
                        medicine_id
                    )));
                }

                let status = prescription::parse_column(cart.prescription_status.as_deref())?;
                recompute_cart(conn, cart.id, status).await
            })
        })
        .await?;

    info!("Customer #{} removed medicine #{} from cart", customer_id, medicine_id);
    Ok(view)
}

/// Empties the cart after checkout and sets its prescription status.
pub async fn clear_cart(
    conn: &mut AsyncPgConnection,
    cart_id: i32,
    prescription_status: Option<PrescriptionStatus>,
) -> Result<(), AppError> {
    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
        .execute(conn)
        .await?;

    diesel::update(carts::table.find(cart_id))
        .set((
            carts::total_amount.eq(BigDecimal::from(0)),
            carts::requires_prescription.eq(false),
            carts::prescription_status.eq(prescription_status.map(|s| s.as_str())),
            carts::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await?;

    Ok(())
}
