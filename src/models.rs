use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::medicines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MedicineEntity {
    pub id: i32,
    pub name: String,
    pub medicine_type: String,
    pub description: Option<String>,
    pub unit: String,
    pub unit_size: i32,
    pub prescription_required: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::stock)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StockEntity {
    pub pharmacy_id: i32,
    pub medicine_id: i32,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::stock)]
pub struct CreateStockEntity {
    pub pharmacy_id: i32,
    pub medicine_id: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: i32,
    pub customer_id: i32,
    #[schema(value_type = String)]
    pub total_amount: BigDecimal,
    pub requires_prescription: bool,
    pub prescription_status: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    pub cart_id: i32,
    pub medicine_id: i32,
    pub quantity: i32,
    pub assigned_pharmacy_id: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::carts)]
pub struct CreateCartEntity {
    pub customer_id: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub medicine_id: i32,
    pub quantity: i32,
    pub assigned_pharmacy_id: i32,
    pub unit_price: BigDecimal,
}

// Prescriptions

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::prescriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PrescriptionEntity {
    pub id: i32,
    pub customer_id: i32,
    pub cart_id: i32,
    pub order_id: Option<i32>,
    pub file_ref: String,
    pub status: String,
    pub doctor_id: Option<i32>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::prescriptions)]
pub struct CreatePrescriptionEntity {
    pub customer_id: i32,
    pub cart_id: i32,
    pub file_ref: String,
    pub status: String,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub customer_id: i32,
    pub cart_id: i32,
    #[schema(value_type = String)]
    pub total_amount: BigDecimal,
    pub final_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub customer_id: i32,
    pub cart_id: i32,
    pub total_amount: BigDecimal,
    pub final_status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::sub_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubOrderEntity {
    pub id: i32,
    pub order_id: i32,
    pub pharmacy_id: i32,
    pub agent_id: Option<i32>,
    pub status: String,
    #[schema(value_type = String)]
    pub sub_total: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sub_orders)]
pub struct CreateSubOrderEntity {
    pub order_id: i32,
    pub pharmacy_id: i32,
    pub status: String,
    pub sub_total: BigDecimal,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::sub_order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubOrderItemEntity {
    pub sub_order_id: i32,
    pub medicine_id: i32,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    #[schema(value_type = String)]
    pub line_total: BigDecimal,
}

// Users and role entities

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub linked_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity {
    pub email: String,
    pub role: String,
    pub linked_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::pharmacies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PharmacyEntity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::customers)]
pub struct CreateCustomerEntity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::pharmacies)]
pub struct CreatePharmacyEntity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::doctors)]
pub struct CreateDoctorEntity {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: Option<String>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::delivery_agents)]
pub struct CreateDeliveryAgentEntity {
    pub name: String,
    pub email: String,
    pub phone: String,
}
