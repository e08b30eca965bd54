use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::info;

use crate::{
    app_error::AppError,
    app_state::AppState,
    db,
    domain::prescription::{self, PrescriptionStatus},
    models::{CreatePrescriptionEntity, PrescriptionEntity},
    schema::{carts, doctors, prescriptions},
    services::carts::lock_cart,
};

/// Stores a prescription reference against the customer's cart and puts the
/// cart back into `To Be Verified`.
pub async fn upload_prescription(
    state: &AppState,
    customer_id: i32,
    file_ref: String,
) -> Result<PrescriptionEntity, AppError> {
    let file_ref = file_ref.trim().to_owned();
    if file_ref.is_empty() {
        return Err(AppError::BadRequest("file_ref cannot be empty".into()));
    }

    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let prescription = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;
                let cart = lock_cart(conn, customer_id).await?;

                let prescription: PrescriptionEntity = diesel::insert_into(prescriptions::table)
                    .values(CreatePrescriptionEntity {
                        customer_id,
                        cart_id: cart.id,
                        file_ref,
                        status: PrescriptionStatus::ToBeVerified.as_str().into(),
                    })
                    .returning(PrescriptionEntity::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::update(carts::table.find(cart.id))
                    .set((
                        carts::prescription_status.eq(PrescriptionStatus::ToBeVerified.as_str()),
                        carts::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await?;

                Ok::<PrescriptionEntity, AppError>(prescription)
            })
        })
        .await?;

    info!(
        "Customer #{} uploaded prescription #{} for cart #{}",
        customer_id, prescription.id, prescription.cart_id
    );
    Ok(prescription)
}

/// Oldest first, so reviewers work the queue in arrival order.
pub async fn list_prescriptions(
    state: &AppState,
    status: Option<PrescriptionStatus>,
) -> Result<Vec<PrescriptionEntity>, AppError> {
    let conn = &mut state.conn().await?;

    let mut query = prescriptions::table
        .order_by((prescriptions::created_at.asc(), prescriptions::id.asc()))
        .select(PrescriptionEntity::as_select())
        .into_boxed();
    if let Some(status) = status {
        query = query.filter(prescriptions::status.eq(status.as_str()));
    }

    Ok(query.load(conn).await?)
}

/// Records a doctor's decision. The cart follows the decision only when this
/// is its newest prescription not yet attached to an order.
pub async fn review_prescription(
    state: &AppState,
    doctor_id: i32,
    prescription_id: i32,
    decision: PrescriptionStatus,
) -> Result<PrescriptionEntity, AppError> {
    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let (prescription, cart_updated) = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;

                let doctors_found: i64 = doctors::table
                    .find(doctor_id)
                    .count()
                    .get_result(conn)
                    .await?;
                if doctors_found == 0 {
                    return Err(AppError::NotFound(format!("Doctor #{} not found", doctor_id)));
                }

                let not_found =
                    || AppError::NotFound(format!("Prescription #{} not found", prescription_id));

                let customer_id: i32 = prescriptions::table
                    .find(prescription_id)
                    .select(prescriptions::customer_id)
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(not_found)?;

                // Cart before prescription, same order as upload and checkout.
                let cart = lock_cart(conn, customer_id).await?;

                let current: PrescriptionEntity = prescriptions::table
                    .find(prescription_id)
                    .select(PrescriptionEntity::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(not_found)?;

                let next = prescription::review(
                    prescription_id,
                    current.status.parse::<PrescriptionStatus>()?,
                    decision,
                )?;

                let updated: PrescriptionEntity =
                    diesel::update(prescriptions::table.find(prescription_id))
                        .set((
                            prescriptions::status.eq(next.as_str()),
                            prescriptions::doctor_id.eq(doctor_id),
                            prescriptions::reviewed_at.eq(diesel::dsl::now),
                        ))
                        .returning(PrescriptionEntity::as_returning())
                        .get_result(conn)
                        .await?;

                let newest_open: Option<i32> = prescriptions::table
                    .filter(prescriptions::cart_id.eq(cart.id))
                    .filter(prescriptions::order_id.is_null())
                    .select(diesel::dsl::max(prescriptions::id))
                    .first(conn)
                    .await?;

                let cart_updated = updated.cart_id == cart.id && newest_open == Some(updated.id);
                if cart_updated {
                    diesel::update(carts::table.find(cart.id))
                        .set((
                            carts::prescription_status.eq(next.as_str()),
                            carts::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;
                }

                Ok::<(PrescriptionEntity, bool), AppError>((updated, cart_updated))
            })
        })
        .await?;

    info!(
        "Doctor #{} marked prescription #{} as {}{}",
        doctor_id,
        prescription.id,
        prescription.status,
        if cart_updated { "" } else { " (superseded, cart unchanged)" }
    );
    Ok(prescription)
}
