// src/services/totals.rs

use rust_decimal::Decimal;

use crate::common::error::AppError;

/// A document line carrying `(unit_price, quantity, vat%)`.
pub trait PricedLine {
    fn unit_price(&self) -> Decimal;
    fn quantity(&self) -> Decimal;
    fn vat(&self) -> Decimal;
}

fn too_large() -> AppError {
    AppError::BadRequest("Giá trị chứng từ vượt quá giới hạn tính toán".into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub temp_total: Decimal,
    pub vat_amount: Decimal,
    pub final_total: Decimal,
}

impl LineAmounts {
    /// Fails with `BadRequest` when an amount leaves the decimal range.
    pub fn of(line: &impl PricedLine) -> Result<Self, AppError> {
        let temp_total = line
            .unit_price()
            .checked_mul(line.quantity())
            .ok_or_else(too_large)?;
        let vat_amount = temp_total
            .checked_mul(line.vat())
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(too_large)?;
        let final_total = temp_total.checked_add(vat_amount).ok_or_else(too_large)?;
        Ok(Self {
            temp_total,
            vat_amount,
            final_total,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentTotals {
    pub total_items: usize,
    pub total_temp: Decimal,
    pub total_vat: Decimal,
    pub total_after_vat: Decimal,
}

impl DocumentTotals {
    pub fn of<'a, L: PricedLine + 'a>(
        lines: impl IntoIterator<Item = &'a L>,
    ) -> Result<Self, AppError> {
        lines.into_iter().try_fold(Self::default(), |acc, line| {
            let amounts = LineAmounts::of(line)?;
            let sum = |a: Decimal, b: Decimal| a.checked_add(b).ok_or_else(too_large);
            Ok(Self {
                total_items: acc.total_items + 1,
                total_temp: sum(acc.total_temp, amounts.temp_total)?,
                total_vat: sum(acc.total_vat, amounts.vat_amount)?,
                total_after_vat: sum(acc.total_after_vat, amounts.final_total)?,
            })
        })
    }
}
