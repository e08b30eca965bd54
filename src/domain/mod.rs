//! Pure workflow rules shared by the services. Nothing in here touches the
//! database, so every rule is unit-testable in isolation.

pub mod allocator;
pub mod cart;
pub mod checkout;
pub mod fulfillment;
pub mod geo;
pub mod prescription;
pub mod role;
