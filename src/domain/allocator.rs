//! Pharmacy assignment for cart items.
//!
//! The cart engine loads every stock row able to cover the requested quantity
//! and asks a [`StockAllocator`] to pick one. Policies only choose; they never
//! touch stock, so they can be swapped without changing the locking story.

use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

use bigdecimal::BigDecimal;

use crate::domain::geo::GeoPoint;

/// A stock row that may serve an allocation request.
#[derive(Debug, Clone, PartialEq)]
pub struct StockCandidate {
    pub pharmacy_id: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRequest {
    pub medicine_id: i32,
    pub quantity: i32,
    pub customer_location: Option<GeoPoint>,
}

pub trait StockAllocator: Send + Sync {
    /// Returns the pharmacy that should serve `request`, or `None` when no
    /// candidate holds enough stock.
    fn allocate(&self, request: &AllocationRequest, candidates: &[StockCandidate]) -> Option<i32>;

    fn name(&self) -> &'static str;
}

fn eligible<'a>(
    request: &'a AllocationRequest,
    candidates: &'a [StockCandidate],
) -> impl Iterator<Item = &'a StockCandidate> + 'a {
    candidates
        .iter()
        .filter(move |c| request.quantity > 0 && c.quantity >= request.quantity)
}

/// Cheaper first, then the larger stock, then the lower pharmacy id.
fn by_price(a: &StockCandidate, b: &StockCandidate) -> Ordering {
    a.unit_price
        .cmp(&b.unit_price)
        .then_with(|| b.quantity.cmp(&a.quantity))
        .then_with(|| a.pharmacy_id.cmp(&b.pharmacy_id))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CheapestPriceAllocator;

impl StockAllocator for CheapestPriceAllocator {
    fn allocate(&self, request: &AllocationRequest, candidates: &[StockCandidate]) -> Option<i32> {
        eligible(request, candidates)
            .min_by(|a, b| by_price(a, b))
            .map(|c| c.pharmacy_id)
    }

    fn name(&self) -> &'static str {
        "cheapest"
    }
}

/// Picks the pharmacy closest to the customer. Candidates without
/// coordinates rank after located ones; without a customer location the
/// cheapest policy decides.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestAllocator;

impl StockAllocator for NearestAllocator {
    fn allocate(&self, request: &AllocationRequest, candidates: &[StockCandidate]) -> Option<i32> {
        let Some(origin) = request.customer_location else {
            return CheapestPriceAllocator.allocate(request, candidates);
        };

        eligible(request, candidates)
            .min_by(|a, b| {
                let da = a.location.map(|p| origin.distance_km(&p));
                let db = b.location.map(|p| origin.distance_km(&p));
                match (da, db) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
                .then_with(|| by_price(a, b))
            })
            .map(|c| c.pharmacy_id)
    }

    fn name(&self) -> &'static str {
        "nearest"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstAvailableAllocator;

impl StockAllocator for FirstAvailableAllocator {
    fn allocate(&self, request: &AllocationRequest, candidates: &[StockCandidate]) -> Option<i32> {
        eligible(request, candidates)
            .map(|c| c.pharmacy_id)
            .min()
    }

    fn name(&self) -> &'static str {
        "first_available"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationPolicy {
    #[default]
    Cheapest,
    Nearest,
    FirstAvailable,
}

impl AllocationPolicy {
    pub fn allocator(self) -> Arc<dyn StockAllocator> {
        match self {
            AllocationPolicy::Cheapest => Arc::new(CheapestPriceAllocator),
            AllocationPolicy::Nearest => Arc::new(NearestAllocator),
            AllocationPolicy::FirstAvailable => Arc::new(FirstAvailableAllocator),
        }
    }
}

impl FromStr for AllocationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cheapest" => Ok(AllocationPolicy::Cheapest),
            "nearest" => Ok(AllocationPolicy::Nearest),
            "first_available" | "first-available" => Ok(AllocationPolicy::FirstAvailable),
            other => Err(format!("unknown allocation policy '{}'", other)),
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.allocator().name())
    }
}
