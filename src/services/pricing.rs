//! Money arithmetic. Every stored amount is rounded to cents, half away from zero,
//! and must fit a `decimal(12, 2)` column.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use validator::ValidationError;

use crate::errors::ServiceError;

pub const MONEY_SCALE: u32 = 2;

/// Largest amount a `decimal(12, 2)` column holds.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Rounds to cents and pins the scale, so `51` serializes as `51.00`.
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Field validator for request amounts: non-negative and storable.
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    if *value > MAX_AMOUNT {
        let mut err = ValidationError::new("amount_too_large");
        err.message = Some(format!("must not exceed {}", MAX_AMOUNT).into());
        return Err(err);
    }
    Ok(())
}

fn storable(amount: Option<Decimal>, what: &str) -> Result<Decimal, ServiceError> {
    match amount.map(round_money) {
        Some(amount) if amount.abs() <= MAX_AMOUNT => Ok(amount),
        _ => Err(ServiceError::InvalidInput(format!(
            "{} exceeds the largest storable amount {}",
            what, MAX_AMOUNT
        ))),
    }
}

/// `quantity × unit_price`, rounded.
pub fn line_subtotal(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    storable(
        Decimal::from(quantity).checked_mul(unit_price),
        "line subtotal",
    )
}

/// Rounded sum of already-rounded line subtotals. Zero lines give zero.
pub fn order_total<I>(subtotals: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    let sum = subtotals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line));
    storable(sum, "order total")
}

/// `quantity × unit_cost + transport_cost`, rounded.
pub fn purchase_order_total(
    quantity: i32,
    unit_cost: Decimal,
    transport_cost: Decimal,
) -> Result<Decimal, ServiceError> {
    let total = Decimal::from(quantity)
        .checked_mul(unit_cost)
        .and_then(|goods| goods.checked_add(transport_cost));
    storable(total, "purchase order total")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_of_two_at_25_50() {
        assert_eq!(line_subtotal(2, dec!(25.50)).unwrap(), dec!(51.00));
        assert_eq!(line_subtotal(4, dec!(25.50)).unwrap(), dec!(102.00));
    }

    #[test]
    fn midpoints_round_away_from_zero() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
        assert_eq!(line_subtotal(3, dec!(0.335)).unwrap(), dec!(1.01));
    }

    #[test]
    fn rounded_amounts_keep_two_places() {
        assert_eq!(round_money(dec!(102)).to_string(), "102.00");
        assert_eq!(order_total(vec![dec!(51), dec!(51)]).unwrap().to_string(), "102.00");
        assert_eq!(order_total(Vec::new()).unwrap().to_string(), "0.00");
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        let lines = std::iter::repeat(dec!(0.10)).take(1000);
        assert_eq!(order_total(lines).unwrap(), dec!(100.00));
        assert_eq!(order_total(Vec::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn purchase_order_with_transport() {
        assert_eq!(
            purchase_order_total(10, dec!(25.50), dec!(50.00)).unwrap(),
            dec!(305.00)
        );
        assert_eq!(purchase_order_total(1, dec!(0.005), dec!(0)).unwrap(), dec!(0.01));
    }

    #[test]
    fn overflowing_arithmetic_is_invalid_input() {
        let huge = Decimal::MAX;
        assert!(matches!(line_subtotal(10, huge), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(
            purchase_order_total(2, huge, dec!(1)),
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            order_total(vec![huge, huge]),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn totals_past_the_column_bound_are_rejected() {
        assert!(line_subtotal(2, MAX_AMOUNT).is_err());
        assert!(order_total(vec![MAX_AMOUNT, dec!(0.01)]).is_err());
        assert_eq!(order_total(vec![MAX_AMOUNT]).unwrap(), MAX_AMOUNT);
        assert!(purchase_order_total(1, MAX_AMOUNT, dec!(0.01)).is_err());
    }

    #[test]
    fn request_amounts_are_bounded() {
        assert!(validate_amount(&dec!(0)).is_ok());
        assert!(validate_amount(&MAX_AMOUNT).is_ok());
        assert!(validate_amount(&dec!(-0.01)).is_err());
        assert!(validate_amount(&dec!(10000000000)).is_err());
        assert!(validate_amount(&dec!(9999999999.991)).is_err());
        assert!(validate_amount(&Decimal::MAX).is_err());
    }
}
