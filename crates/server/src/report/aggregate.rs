//! Pure sales and refund arithmetic over fetched orders.
//!
//! Two paginated passes feed these functions: Pass A (orders filtered by
//! creation time) yields gross sales and the order count; Pass B (filtered
//! by update time) yields the refunds whose `processed_at` falls inside the
//! window, including refunds against orders created before it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use spendsheet_core::round_money;

use crate::services::shopify::{Order, Refund};

/// Gross sales: the sum of `total_price` over the Pass A orders, unrounded.
#[must_use]
pub fn gross_sales(orders: &[Order]) -> Decimal {
    orders.iter().map(|order| order.total_price).sum()
}

/// Order count for the period, from Pass A only. Refunds never change it.
#[must_use]
pub fn order_count(orders: &[Order]) -> u64 {
    orders.len() as u64
}

/// Item-level amount of one refund, via the three-tier fallback.
///
/// 1. Successful refund-kind transaction amounts minus the recorded
///    shipping amount, floored at zero - used when positive. Shipping is
///    subtracted exactly once here and never re-counted by the later tiers.
/// 2. Otherwise, `subtotal + total_tax` summed over the refund line items.
/// 3. Otherwise, the refund's raw `amount` field.
#[must_use]
pub fn refund_amount(refund: &Refund) -> Decimal {
    let transacted: Decimal = refund
        .transactions
        .iter()
        .filter(|txn| txn.kind == "refund" && txn.status == "success")
        .map(|txn| txn.amount)
        .sum();
    let shipping = refund
        .shipping
        .as_ref()
        .map(|s| s.amount)
        .unwrap_or_default();

    let net_of_shipping = (transacted - shipping).max(Decimal::ZERO);
    if net_of_shipping > Decimal::ZERO {
        return net_of_shipping;
    }

    let line_items: Decimal = refund
        .refund_line_items
        .iter()
        .map(|item| item.subtotal + item.total_tax)
        .sum();
    if line_items > Decimal::ZERO {
        return line_items;
    }

    refund.amount.unwrap_or_default()
}

/// Total refunds processed inside `[window_start, window_end]`, over the
/// Pass B orders.
#[must_use]
pub fn refund_total(
    orders: &[Order],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Decimal {
    orders
        .iter()
        .flat_map(|order| &order.refunds)
        .filter(|refund| {
            window_start <= refund.processed_at && refund.processed_at <= window_end
        })
        .map(refund_amount)
        .sum()
}

/// Net sales, rounded to 2 decimal places half-up.
#[must_use]
pub fn net_sales(gross: Decimal, refunds: Decimal) -> Decimal {
    round_money(gross - refunds)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn order(id: u64, total_price: &str, created_at: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "total_price": total_price,
            "created_at": created_at,
            "updated_at": created_at,
        }))
        .unwrap()
    }

    fn refund(json: serde_json::Value) -> Refund {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_gross_sales_and_count() {
        let orders = vec![
            order(1, "50.00", "2024-05-06T10:00:00Z"),
            order(2, "60.00", "2024-05-07T10:00:00Z"),
            order(3, "40.00", "2024-05-08T10:00:00Z"),
        ];
        assert_eq!(gross_sales(&orders), dec("150.00"));
        assert_eq!(order_count(&orders), 3);
    }

    #[test]
    fn test_refund_tier_one_subtracts_shipping_once() {
        let r = refund(serde_json::json!({
            "processed_at": "2024-05-07T09:00:00Z",
            "transactions": [
                {"kind": "refund", "status": "success", "amount": "25.00"},
            ],
            "shipping": {"amount": "5.00"},
            "refund_line_items": [{"subtotal": "100.00", "total_tax": "10.00"}],
            "amount": "99.00"
        }));
        // Transactions minus shipping wins; line items and raw amount ignored.
        assert_eq!(refund_amount(&r), dec("20.00"));
    }

    #[test]
    fn test_refund_tier_one_ignores_failed_and_sale_transactions() {
        let r = refund(serde_json::json!({
            "processed_at": "2024-05-07T09:00:00Z",
            "transactions": [
                {"kind": "refund", "status": "success", "amount": "20.00"},
                {"kind": "refund", "status": "failure", "amount": "99.00"},
                {"kind": "sale", "status": "success", "amount": "99.00"},
            ],
            "amount": "0.00"
        }));
        assert_eq!(refund_amount(&r), dec("20.00"));
    }

    #[test]
    fn test_refund_tier_two_when_shipping_swallows_transactions() {
        let r = refund(serde_json::json!({
            "processed_at": "2024-05-07T09:00:00Z",
            "transactions": [
                {"kind": "refund", "status": "success", "amount": "5.00"},
            ],
            "shipping": {"amount": "10.00"},
            "refund_line_items": [
                {"subtotal": "4.00", "total_tax": "1.00"},
            ],
            "amount": "99.00"
        }));
        // Floored at zero, so line items decide.
        assert_eq!(refund_amount(&r), dec("5.00"));
    }

    #[test]
    fn test_refund_tier_three_raw_amount() {
        let r = refund(serde_json::json!({
            "processed_at": "2024-05-07T09:00:00Z",
            "amount": "12.34"
        }));
        assert_eq!(refund_amount(&r), dec("12.34"));
    }

    #[test]
    fn test_refund_defaults_to_zero_when_nothing_recorded() {
        let r = refund(serde_json::json!({
            "processed_at": "2024-05-07T09:00:00Z"
        }));
        assert_eq!(refund_amount(&r), Decimal::ZERO);
    }

    #[test]
    fn test_refund_total_filters_by_processed_at() {
        let mut o = order(1, "100.00", "2024-04-01T10:00:00Z");
        o.refunds = vec![
            refund(serde_json::json!({
                "processed_at": "2024-05-07T09:00:00Z",
                "amount": "20.00"
            })),
            refund(serde_json::json!({
                "processed_at": "2024-04-02T09:00:00Z",
                "amount": "50.00"
            })),
        ];
        let start = "2024-05-06T00:00:00Z".parse().unwrap();
        let end = "2024-05-12T23:59:59Z".parse().unwrap();
        // Only the refund processed inside the window counts, even though
        // the order itself predates it.
        assert_eq!(refund_total(&[o], start, end), dec("20.00"));
    }

    #[test]
    fn test_refund_total_window_boundaries_inclusive() {
        let mut o = order(1, "100.00", "2024-05-06T00:00:00Z");
        o.refunds = vec![refund(serde_json::json!({
            "processed_at": "2024-05-12T23:59:59Z",
            "amount": "10.00"
        }))];
        let start = "2024-05-06T00:00:00Z".parse().unwrap();
        let end = "2024-05-12T23:59:59Z".parse().unwrap();
        assert_eq!(refund_total(&[o], start, end), dec("10.00"));
    }

    #[test]
    fn test_net_sales_rounds_half_up() {
        assert_eq!(net_sales(dec("150.00"), dec("20.00")), dec("130.00"));
        assert_eq!(net_sales(dec("10.005"), Decimal::ZERO), dec("10.01"));
    }
}
