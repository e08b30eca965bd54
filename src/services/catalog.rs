use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    app_state::AppState,
    db,
    domain::cart,
    models::{CreateStockEntity, MedicineEntity, StockEntity},
    schema::{medicines, pharmacies, stock},
};

pub async fn get_medicine(conn: &mut AsyncPgConnection, id: i32) -> Result<MedicineEntity, AppError> {
    medicines::table
        .find(id)
        .select(MedicineEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Medicine #{} not found", id)))
}

/// Case-insensitive substring search on the medicine name; no filter lists
/// the whole catalog.
pub async fn search_medicines(
    conn: &mut AsyncPgConnection,
    name: Option<&str>,
) -> Result<Vec<MedicineEntity>, AppError> {
    let mut query = medicines::table
        .select(MedicineEntity::as_select())
        .order_by((medicines::name.asc(), medicines::id.asc()))
        .into_boxed();

    if let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) {
        query = query.filter(medicines::name.ilike(format!("%{}%", escape_like(name))));
    }

    Ok(query.load(conn).await?)
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn ensure_pharmacy_exists(conn: &mut AsyncPgConnection, id: i32) -> Result<(), AppError> {
    let count: i64 = pharmacies::table
        .find(id)
        .count()
        .get_result(conn)
        .await?;

    if count == 0 {
        return Err(AppError::NotFound(format!("Pharmacy #{} not found", id)));
    }
    Ok(())
}

pub async fn get_stock(
    conn: &mut AsyncPgConnection,
    pharmacy_id: i32,
    medicine_id: i32,
) -> Result<StockEntity, AppError> {
    stock::table
        .find((pharmacy_id, medicine_id))
        .select(StockEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Pharmacy #{} has no stock record for medicine #{}",
                pharmacy_id, medicine_id
            ))
        })
}

pub async fn list_pharmacy_stock(
    conn: &mut AsyncPgConnection,
    pharmacy_id: i32,
) -> Result<Vec<StockEntity>, AppError> {
    ensure_pharmacy_exists(conn, pharmacy_id).await?;

    Ok(stock::table
        .filter(stock::pharmacy_id.eq(pharmacy_id))
        .order_by(stock::medicine_id.asc())
        .select(StockEntity::as_select())
        .load(conn)
        .await?)
}

#[derive(Serialize, ToSchema, Debug)]
pub struct StockUpsert {
    pub stock: StockEntity,
    pub created: bool,
}

pub fn validate_stock_values(quantity: i32, unit_price: &BigDecimal) -> Result<(), AppError> {
    if quantity < 0 {
        return Err(AppError::BadRequest("quantity cannot be negative".into()));
    }
    if *unit_price < BigDecimal::from(0) {
        return Err(AppError::BadRequest("unit_price cannot be negative".into()));
    }
    if !cart::fits_money(unit_price) {
        return Err(AppError::BadRequest(format!(
            "unit_price must have at most two decimal places and not exceed {}",
            cart::max_amount()
        )));
    }
    Ok(())
}

/// Sets a pharmacy's quantity and price for a medicine. The row is looked up
/// first and then updated or inserted, all under one transaction.
pub async fn upsert_stock(
    state: &AppState,
    acting_pharmacy_id: i32,
    pharmacy_id: i32,
    medicine_id: i32,
    quantity: i32,
    unit_price: BigDecimal,
) -> Result<StockUpsert, AppError> {
    if acting_pharmacy_id != pharmacy_id {
        return Err(AppError::NotOwner(format!(
            "Pharmacy #{} cannot update the stock of pharmacy #{}",
            acting_pharmacy_id, pharmacy_id
        )));
    }
    validate_stock_values(quantity, &unit_price)?;

    let lock_timeout_ms = state.lock_timeout_ms();
    let conn = &mut state.conn().await?;

    let result = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                db::set_lock_timeout(conn, lock_timeout_ms).await?;
                ensure_pharmacy_exists(conn, pharmacy_id).await?;
                get_medicine(conn, medicine_id).await?;

                let existing: Option<StockEntity> = stock::table
                    .find((pharmacy_id, medicine_id))
                    .select(StockEntity::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?;

                let upsert = match existing {
                    Some(_) => StockUpsert {
                        stock: diesel::update(stock::table.find((pharmacy_id, medicine_id)))
                            .set((
                                stock::quantity.eq(quantity),
                                stock::unit_price.eq(&unit_price),
                                stock::updated_at.eq(diesel::dsl::now),
                            ))
                            .returning(StockEntity::as_returning())
                            .get_result(conn)
                            .await?,
                        created: false,
                    },
                    None => StockUpsert {
                        stock: diesel::insert_into(stock::table)
                            .values(CreateStockEntity {
                                pharmacy_id,
                                medicine_id,
                                quantity,
                                unit_price: unit_price.clone(),
                            })
                            .returning(StockEntity::as_returning())
                            .get_result(conn)
                            .await?,
                        created: true,
                    },
                };

                Ok::<StockUpsert, AppError>(upsert)
            })
        })
        .await?;

    info!(
        "Stock for medicine #{} at pharmacy #{} {} (quantity {})",
        medicine_id,
        pharmacy_id,
        if result.created { "created" } else { "updated" },
        result.stock.quantity
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("para"), "para");
    }

    #[test]
    fn stock_values_must_be_non_negative() {
        assert!(validate_stock_values(0, &BigDecimal::from(0)).is_ok());
        assert!(matches!(
            validate_stock_values(-1, &BigDecimal::from(1)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_stock_values(1, &BigDecimal::from(-1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn unit_price_must_fit_a_money_column() {
        let price = |s: &str| s.parse::<BigDecimal>().unwrap();
        assert!(validate_stock_values(i32::MAX, &price("9999999999.99")).is_ok());
        assert!(matches!(
            validate_stock_values(1, &price("100000000000")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_stock_values(1, &price("4.999")),
            Err(AppError::BadRequest(_))
        ));
    }
}
