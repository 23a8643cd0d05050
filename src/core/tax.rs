use serde::Serialize;

use super::types::TaxSettings;

pub const BASIC_RATE: f64 = 0.20;
pub const HIGHER_RATE: f64 = 0.40;

/// Running view of one person's bands within a single tax year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxPosition {
    pub personal_allowance_remaining: f64,
    pub basic_rate_remaining: f64,
    pub tax: f64,
}

impl TaxPosition {
    pub fn initial(settings: &TaxSettings, band_multiplier: f64) -> Self {
        let allowance = settings.personal_allowance * band_multiplier;
        let threshold = settings.higher_rate_threshold * band_multiplier;
        Self {
            personal_allowance_remaining: allowance,
            basic_rate_remaining: (threshold - allowance).max(0.0),
            tax: 0.0,
        }
    }

    #[must_use]
    pub fn update(&self, taxable_income: f64) -> Self {
        let income = taxable_income.max(0.0);
        if income < self.personal_allowance_remaining {
            return Self {
                personal_allowance_remaining: self.personal_allowance_remaining - income,
                ..*self
            };
        }

        let basic_rated = income - self.personal_allowance_remaining;
        if basic_rated < self.basic_rate_remaining {
            return Self {
                personal_allowance_remaining: 0.0,
                basic_rate_remaining: self.basic_rate_remaining - basic_rated,
                tax: self.tax + basic_rated * BASIC_RATE,
            };
        }

        let higher_rated = basic_rated - self.basic_rate_remaining;
        Self {
            personal_allowance_remaining: 0.0,
            basic_rate_remaining: 0.0,
            tax: self.tax + self.basic_rate_remaining * BASIC_RATE + higher_rated * HIGHER_RATE,
        }
    }

    pub fn room_before_higher_rate(&self) -> f64 {
        (self.basic_rate_remaining + self.personal_allowance_remaining).max(0.0)
    }
}
