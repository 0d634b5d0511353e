// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Giá trị không được âm".into());
        return Err(err);
    }
    Ok(())
}

pub fn vat_percent(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    if *value > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("vat_percent");
        err.message = Some("VAT phải nằm trong khoảng 0 đến 100".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn vat_range_is_inclusive() {
        assert!(vat_percent(&dec!(0)).is_ok());
        assert!(vat_percent(&dec!(100)).is_ok());
        assert!(vat_percent(&dec!(100.5)).is_err());
        assert!(vat_percent(&dec!(-1)).is_err());
    }

    #[test]
    fn negative_zero_is_accepted() {
        assert!(non_negative(&dec!(-0)).is_ok());
        assert!(non_negative(&dec!(-0.01)).is_err());
    }
}
