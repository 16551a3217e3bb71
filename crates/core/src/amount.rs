//! Numeric bounds for stored quantities and money.
//!
//! Quantities are persisted as `NUMERIC(20, 6)` and money as `NUMERIC(20, 2)`.
//! Anything finer or larger than those columns is rejected up front so both
//! storage backends hold exactly the values that were validated.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Decimal places a quantity may carry.
pub const QUANTITY_SCALE: u32 = 6;

/// Decimal places a money amount may carry.
pub const MONEY_SCALE: u32 = 2;

/// Largest quantity magnitude: `99_999_999_999_999.999999`.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, 6);

/// Largest money magnitude: `999_999_999_999_999_999.99`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_661_992_959, 1_808_227_885, 5, false, 2);

/// Most lines a single movement, order or journal entry may carry.
pub const MAX_LINES: usize = 10_000;

pub fn out_of_range() -> DomainError {
    DomainError::validation("amount out of range")
}

/// Reject quantities with more than six decimal places or outside the column range.
pub fn check_quantity(what: &str, value: Decimal) -> DomainResult<()> {
    if value.normalize().scale() > QUANTITY_SCALE {
        return Err(DomainError::validation(format!(
            "{what}: quantity has more than {QUANTITY_SCALE} decimal places"
        )));
    }
    if value.abs() > MAX_QUANTITY {
        return Err(DomainError::validation(format!("{what}: quantity out of range")));
    }
    Ok(())
}

/// Reject money with more than two decimal places or outside the column range.
pub fn check_amount(what: &str, value: Decimal) -> DomainResult<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(DomainError::validation(format!(
            "{what}: amount has more than {MONEY_SCALE} decimal places"
        )));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(DomainError::validation(format!("{what}: amount out of range")));
    }
    Ok(())
}

pub fn check_line_count(what: &str, lines: usize) -> DomainResult<()> {
    if lines > MAX_LINES {
        return Err(DomainError::validation(format!(
            "{what} has {lines} lines, at most {MAX_LINES} are allowed"
        )));
    }
    Ok(())
}

/// `Σ values`, failing instead of overflowing.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bounds_match_column_limits() {
        assert_eq!(MAX_QUANTITY, dec!(99999999999999.999999));
        assert_eq!(MAX_AMOUNT, dec!(999999999999999999.99));
    }

    #[test]
    fn quantity_scale_ignores_trailing_zeros() {
        assert!(check_quantity("item 0", dec!(1.5000000)).is_ok());
        assert!(check_quantity("item 0", dec!(0.000001)).is_ok());
        assert!(matches!(
            check_quantity("item 0", dec!(0.0000001)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn amount_scale_is_cents() {
        assert!(check_amount("line 0", dec!(19.99)).is_ok());
        assert!(check_amount("line 0", dec!(19.990)).is_ok());
        assert!(matches!(check_amount("line 0", dec!(0.005)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn magnitudes_beyond_columns_are_rejected() {
        assert!(check_quantity("item 0", MAX_QUANTITY).is_ok());
        assert!(check_quantity("item 0", Decimal::MAX).is_err());
        assert!(check_amount("line 0", MAX_AMOUNT).is_ok());
        assert!(check_amount("line 0", MAX_AMOUNT + dec!(0.01)).is_err());
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2)]), Ok(dec!(3.5)));
        assert_eq!(checked_sum([Decimal::MAX, Decimal::MAX]), Err(out_of_range()));
    }

    #[test]
    fn line_count_is_capped() {
        assert!(check_line_count("order", MAX_LINES).is_ok());
        assert!(check_line_count("order", MAX_LINES + 1).is_err());
    }
}
