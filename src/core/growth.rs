use super::pool::AssetPool;
use super::types::{AssetCategory, Assumptions, GrowthClass, InvestmentBalance, MarketShock};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRates([f64; AssetCategory::ALL.len()]);

impl GrowthRates {
    pub fn from_assumptions(assumptions: &Assumptions) -> Self {
        let mut rates = [0.0; AssetCategory::ALL.len()];
        for category in AssetCategory::ALL {
            rates[category.index()] = assumptions.growth_rate(category.growth_class());
        }
        Self(rates)
    }

    pub fn uniform(rate: f64) -> Self {
        Self([rate; AssetCategory::ALL.len()])
    }

    pub fn with(mut self, category: AssetCategory, rate: f64) -> Self {
        self.0[category.index()] = rate;
        self
    }

    pub fn rate(&self, category: AssetCategory) -> f64 {
        self.0[category.index()]
    }
}

/// Holds the initial weight up to retirement, then moves linearly to the
/// target over `years_to_target` and stays there.
pub fn equity_weight(glide: &InvestmentBalance, age: u32, retirement_age: u32) -> f64 {
    let initial = glide.initial_equity_percentage;
    let target = glide.target_equity_percentage;
    let weight = if age <= retirement_age {
        initial
    } else {
        let years_retired = age - retirement_age;
        if glide.years_to_target == 0 || years_retired >= glide.years_to_target {
            target
        } else {
            let progress = years_retired as f64 / glide.years_to_target as f64;
            initial + (target - initial) * progress
        }
    };
    weight.clamp(0.0, 100.0)
}

pub fn isa_growth_rate(assumptions: &Assumptions, age: u32, retirement_age: u32) -> f64 {
    let stocks = assumptions.growth_rate(GrowthClass::Stocks);
    match assumptions.glide_path() {
        Some(glide) => {
            let equity = equity_weight(glide, age, retirement_age) / 100.0;
            let bonds = assumptions.growth_rate(GrowthClass::Bonds);
            equity * stocks + (1.0 - equity) * bonds
        }
        None => stocks,
    }
}

pub fn apply_growth(
    pools: &mut [AssetPool],
    assumptions: &Assumptions,
    age: u32,
    retirement_age: u32,
) {
    let isa_rate = isa_growth_rate(assumptions, age, retirement_age);
    for pool in pools.iter_mut() {
        for category in AssetCategory::ALL {
            let rate = match category {
                AssetCategory::Isa => isa_rate,
                other => assumptions.growth_rate(other.growth_class()),
            };
            pool[category] *= 1.0 + rate;
        }
    }
}

pub fn apply_market_shock(pools: &mut [AssetPool], shock: Option<&MarketShock>) {
    let Some(shock) = shock else {
        return;
    };
    let multiplier = (100.0 + shock.impact_percent) / 100.0;
    for pool in pools.iter_mut() {
        for category in AssetCategory::ALL {
            if category.growth_class() == GrowthClass::Stocks {
                pool[category] *= multiplier;
            }
        }
    }
}
