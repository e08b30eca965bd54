use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    app_state::AppState,
    domain::{geo::GeoPoint, role::Role},
    models::{
        CreateCartEntity, CreateCustomerEntity, CreateDeliveryAgentEntity, CreateDoctorEntity,
        CreatePharmacyEntity, CreateUserEntity,
    },
    schema::{carts, customers, delivery_agents, doctors, pharmacies, users},
};

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct Registration {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct RegistrationReceipt {
    pub user_id: i32,
    pub role: Role,
    pub linked_id: i32,
    pub cart_id: Option<i32>,
}

fn non_empty(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(value.to_owned())
}

const EMAIL_MAX_CHARS: usize = 255;
const PHONE_MAX_CHARS: usize = 32;
const LICENSE_MAX_CHARS: usize = 64;

fn at_most(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{} cannot be longer than {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Trims every field and rejects obviously invalid input.
pub fn normalize(registration: Registration) -> Result<Registration, AppError> {
    let email = non_empty("email", &registration.email)?.to_lowercase();
    at_most("email", &email, EMAIL_MAX_CHARS)?;
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::BadRequest(format!("{} is not a valid email", email)));
    }

    let phone = non_empty("phone", &registration.phone)?;
    at_most("phone", &phone, PHONE_MAX_CHARS)?;
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
    {
        return Err(AppError::BadRequest("phone may only contain digits, spaces, '+' and '-'".into()));
    }

    let address = registration
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_owned);
    if registration.role == Role::Pharmacy && address.is_none() {
        return Err(AppError::BadRequest("A pharmacy must provide an address".into()));
    }

    let license_number = registration
        .license_number
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned);
    if let Some(license) = &license_number {
        at_most("license_number", license, LICENSE_MAX_CHARS)?;
    }

    Ok(Registration {
        role: registration.role,
        name: non_empty("name", &registration.name)?,
        email,
        phone,
        address,
        license_number,
    })
}

async fn locate(state: &AppState, registration: &Registration) -> Option<GeoPoint> {
    let address = registration.address.as_deref()?;
    if !matches!(registration.role, Role::Customer | Role::Pharmacy) {
        return None;
    }

    match state.geocoder.geocode(address).await {
        Ok(Some(point)) => Some(point),
        Ok(None) => {
            warn!("No coordinates found for {}'s address", registration.email);
            None
        }
        Err(err) => {
            warn!("Geocoding failed for {}: {}", registration.email, err);
            None
        }
    }
}

async fn insert_role_row(
    conn: &mut AsyncPgConnection,
    registration: &Registration,
    location: Option<GeoPoint>,
) -> Result<i32, AppError> {
    let Registration {
        role,
        name,
        email,
        phone,
        address,
        license_number,
    } = registration.clone();
    let latitude = location.map(|point| point.latitude);
    let longitude = location.map(|point| point.longitude);

    let id: i32 = match role {
        Role::Customer => {
            diesel::insert_into(customers::table)
                .values(CreateCustomerEntity {
                    name,
                    email,
                    phone,
                    address,
                    latitude,
                    longitude,
                })
                .returning(customers::id)
                .get_result(conn)
                .await?
        }
        Role::Pharmacy => {
            diesel::insert_into(pharmacies::table)
                .values(CreatePharmacyEntity {
                    name,
                    email,
                    phone,
                    address,
                    latitude,
                    longitude,
                })
                .returning(pharmacies::id)
                .get_result(conn)
                .await?
        }
        Role::Doctor => {
            diesel::insert_into(doctors::table)
                .values(CreateDoctorEntity {
                    name,
                    email,
                    phone,
                    license_number,
                })
                .returning(doctors::id)
                .get_result(conn)
                .await?
        }
        Role::DeliveryAgent => {
            diesel::insert_into(delivery_agents::table)
                .values(CreateDeliveryAgentEntity { name, email, phone })
                .returning(delivery_agents::id)
                .get_result(conn)
                .await?
        }
    };

    Ok(id)
}

/// Creates the role entity, its user row and, for customers, an empty cart.
/// Geocoding happens before the transaction; a failed lookup leaves the
/// coordinates empty instead of failing the registration.
pub async fn register(
    state: &AppState,
    registration: Registration,
) -> Result<RegistrationReceipt, AppError> {
    let registration = normalize(registration)?;
    let location = locate(state, &registration).await;

    let conn = &mut state.conn().await?;

    let receipt = conn
        .build_transaction()
        .read_committed()
        .run(move |conn| {
            Box::pin(async move {
                let taken: i64 = users::table
                    .filter(users::email.eq(&registration.email))
                    .count()
                    .get_result(conn)
                    .await?;
                if taken > 0 {
                    return Err(AppError::Conflict(format!(
                        "{} is already registered",
                        registration.email
                    )));
                }

                let linked_id = insert_role_row(conn, &registration, location).await?;

                let user_id: i32 = diesel::insert_into(users::table)
                    .values(CreateUserEntity {
                        email: registration.email.clone(),
                        role: registration.role.as_str().into(),
                        linked_id,
                    })
                    .returning(users::id)
                    .get_result(conn)
                    .await?;

                let cart_id = if registration.role == Role::Customer {
                    let id: i32 = diesel::insert_into(carts::table)
                        .values(CreateCartEntity {
                            customer_id: linked_id,
                        })
                        .returning(carts::id)
                        .get_result(conn)
                        .await?;
                    Some(id)
                } else {
                    None
                };

                Ok::<RegistrationReceipt, AppError>(RegistrationReceipt {
                    user_id,
                    role: registration.role,
                    linked_id,
                    cart_id,
                })
            })
        })
        .await?;

    info!(
        "Registered {} #{} as user #{}",
        receipt.role, receipt.linked_id, receipt.user_id
    );
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(role: Role) -> Registration {
        Registration {
            role,
            name: "  Somchai  ".into(),
            email: " Somchai@Example.com ".into(),
            phone: "+66 81-234-5678".into(),
            address: Some("  12 Sukhumvit Rd ".into()),
            license_number: Some("   ".into()),
        }
    }

    #[test]
    fn normalizes_fields() {
        let normalized = normalize(registration(Role::Customer)).unwrap();
        assert_eq!(normalized.name, "Somchai");
        assert_eq!(normalized.email, "somchai@example.com");
        assert_eq!(normalized.address.as_deref(), Some("12 Sukhumvit Rd"));
        assert_eq!(normalized.license_number, None);
    }

    #[test]
    fn rejects_bad_email_and_phone() {
        let mut bad_email = registration(Role::Doctor);
        bad_email.email = "not-an-email".into();
        assert!(matches!(normalize(bad_email), Err(AppError::BadRequest(_))));

        let mut bad_phone = registration(Role::Doctor);
        bad_phone.phone = "call me".into();
        assert!(matches!(normalize(bad_phone), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_fields_longer_than_their_columns() {
        let mut long_email = registration(Role::Customer);
        long_email.email = format!("{}@example.com", "a".repeat(300));
        assert!(matches!(normalize(long_email), Err(AppError::BadRequest(_))));

        let mut long_phone = registration(Role::Customer);
        long_phone.phone = "1".repeat(33);
        assert!(matches!(normalize(long_phone), Err(AppError::BadRequest(_))));

        let mut long_license = registration(Role::Doctor);
        long_license.license_number = Some("L".repeat(65));
        assert!(matches!(normalize(long_license), Err(AppError::BadRequest(_))));

        let mut at_limit = registration(Role::Customer);
        at_limit.phone = "1".repeat(32);
        assert!(normalize(at_limit).is_ok());
    }

    #[test]
    fn pharmacy_requires_address() {
        let mut pharmacy = registration(Role::Pharmacy);
        pharmacy.address = None;
        assert!(matches!(normalize(pharmacy), Err(AppError::BadRequest(_))));

        let mut agent = registration(Role::DeliveryAgent);
        agent.address = None;
        assert!(normalize(agent).is_ok());
    }
}
