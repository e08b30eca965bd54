use std::collections::{BTreeMap, HashMap};

use bigdecimal::BigDecimal;

use crate::{
    app_error::AppError,
    domain::cart::{fits_money, line_total, max_amount},
};

/// A cart item at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine {
    pub medicine_id: i32,
    pub pharmacy_id: i32,
    pub quantity: i32,
}

/// The locked stock row backing a cart item, re-read at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct StockLevel {
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub medicine_id: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSubOrder {
    pub pharmacy_id: i32,
    pub items: Vec<PlannedItem>,
    pub sub_total: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub sub_orders: Vec<PlannedSubOrder>,
    pub total_amount: BigDecimal,
}

/// Splits a cart into one sub-order per assigned pharmacy, pricing every
/// line with the current stock price. Fails without side effects when any
/// stock row is gone or no longer covers its line.
pub fn plan_checkout(
    lines: &[CheckoutLine],
    stock: &HashMap<(i32, i32), StockLevel>,
) -> Result<CheckoutPlan, AppError> {
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut groups: BTreeMap<i32, Vec<PlannedItem>> = BTreeMap::new();
    for line in lines {
        let level = stock
            .get(&(line.pharmacy_id, line.medicine_id))
            .ok_or_else(|| {
                AppError::StockConflict(format!(
                    "Pharmacy #{} no longer stocks medicine #{}",
                    line.pharmacy_id, line.medicine_id
                ))
            })?;

        if level.quantity < line.quantity {
            return Err(AppError::StockConflict(format!(
                "Pharmacy #{} has {} units of medicine #{} left, {} requested",
                line.pharmacy_id, level.quantity, line.medicine_id, line.quantity
            )));
        }

        groups.entry(line.pharmacy_id).or_default().push(PlannedItem {
            medicine_id: line.medicine_id,
            quantity: line.quantity,
            unit_price: level.unit_price.clone(),
            line_total: line_total(line.quantity, &level.unit_price),
        });
    }

    let sub_orders: Vec<PlannedSubOrder> = groups
        .into_iter()
        .map(|(pharmacy_id, items)| {
            let sub_total = items
                .iter()
                .fold(BigDecimal::from(0), |acc, item| acc + &item.line_total);
            PlannedSubOrder {
                pharmacy_id,
                items,
                sub_total,
            }
        })
        .collect();

    let total_amount = sub_orders
        .iter()
        .fold(BigDecimal::from(0), |acc, sub| acc + &sub.sub_total);

    // Totals are sums of non-negative lines, so bounding the grand total
    // bounds every sub-total and line.
    if !fits_money(&total_amount) {
        return Err(AppError::BadRequest(format!(
            "Order total {} exceeds {}",
            total_amount,
            max_amount()
        )));
    }

    Ok(CheckoutPlan {
        sub_orders,
        total_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(quantity: i32, price: i64) -> StockLevel {
        StockLevel {
            quantity,
            unit_price: BigDecimal::from(price),
        }
    }

    fn line(medicine_id: i32, pharmacy_id: i32, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            medicine_id,
            pharmacy_id,
            quantity,
        }
    }

    #[test]
    fn single_pharmacy_scenario() {
        let stock = HashMap::from([((1, 100), level(5, 10))]);
        let plan = plan_checkout(&[line(100, 1, 2)], &stock).unwrap();

        assert_eq!(plan.sub_orders.len(), 1);
        assert_eq!(plan.sub_orders[0].pharmacy_id, 1);
        assert_eq!(plan.sub_orders[0].sub_total, BigDecimal::from(20));
        assert_eq!(plan.total_amount, BigDecimal::from(20));
    }

    #[test]
    fn groups_lines_by_pharmacy_and_sums_totals() {
        let stock = HashMap::from([
            ((1, 100), level(5, 10)),
            ((1, 101), level(5, 3)),
            ((2, 102), level(9, 7)),
        ]);
        let plan = plan_checkout(
            &[line(102, 2, 1), line(100, 1, 2), line(101, 1, 4)],
            &stock,
        )
        .unwrap();

        let pharmacies: Vec<i32> = plan.sub_orders.iter().map(|s| s.pharmacy_id).collect();
        assert_eq!(pharmacies, vec![1, 2]);
        assert_eq!(plan.sub_orders[0].items.len(), 2);
        assert_eq!(plan.sub_orders[0].sub_total, BigDecimal::from(32));
        assert_eq!(plan.sub_orders[1].sub_total, BigDecimal::from(7));

        let sum = plan
            .sub_orders
            .iter()
            .fold(BigDecimal::from(0), |acc, s| acc + &s.sub_total);
        assert_eq!(sum, plan.total_amount);
        assert_eq!(plan.total_amount, BigDecimal::from(39));
    }

    #[test]
    fn uses_current_stock_price() {
        let stock = HashMap::from([((1, 100), level(5, 12))]);
        let plan = plan_checkout(&[line(100, 1, 2)], &stock).unwrap();
        assert_eq!(plan.sub_orders[0].items[0].unit_price, BigDecimal::from(12));
        assert_eq!(plan.total_amount, BigDecimal::from(24));
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(matches!(plan_checkout(&[], &HashMap::new()), Err(AppError::EmptyCart)));
    }

    #[test]
    fn shortfall_in_any_group_aborts_the_whole_plan() {
        let stock = HashMap::from([((1, 100), level(5, 10)), ((2, 101), level(1, 10))]);
        let result = plan_checkout(&[line(100, 1, 2), line(101, 2, 3)], &stock);
        assert!(matches!(result, Err(AppError::StockConflict(_))));
    }

    #[test]
    fn order_total_must_fit_a_money_column() {
        let price: BigDecimal = "9999999999.00".parse().unwrap();
        let stock = HashMap::from([(
            (1, 100),
            StockLevel {
                quantity: 10,
                unit_price: price,
            },
        )]);
        let result = plan_checkout(&[line(100, 1, 2)], &stock);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn missing_stock_row_is_a_conflict() {
        let result = plan_checkout(&[line(100, 1, 1)], &HashMap::new());
        assert!(matches!(result, Err(AppError::StockConflict(_))));
    }
}
