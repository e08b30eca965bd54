pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod fulfillment;
pub mod orders;
pub mod prescriptions;
pub mod registration;
