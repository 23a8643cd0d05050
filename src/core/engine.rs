use chrono::{DateTime, Datelike, Local, NaiveDate};

use super::drawdown::{DrawdownStrategy, Strategy};
use super::growth::{GrowthRates, apply_growth, apply_market_shock};
use super::pool::{AssetPool, PRIMARY, SPOUSE, build_pools, combine};
use super::tax::TaxPosition;
use super::transfers::{apply_bed_and_isa, apply_one_offs};
use super::types::{
    AssetCategory, IncomeNeed, ProjectionResult, RetirementData, RetirementIncome,
    WithdrawalStrategy, YearlyDatapoint,
};

pub const STATE_PENSION_ANNUAL: f64 = 11_502.0;
pub const STATE_PENSION_AGE: u32 = 67;
pub const MAX_PROJECTION_AGE: u32 = 100;

pub fn calculate_projection(
    data: &RetirementData,
    max_years: Option<u32>,
    strategy: WithdrawalStrategy,
) -> ProjectionResult {
    calculate_projection_at(data, max_years, strategy, Local::now().year())
}

/// Same as [`calculate_projection`], with "now" pinned to `current_year`.
///
/// Missing or unparseable date of birth, or an empty asset list, yields an
/// empty result. The caller's record is never mutated.
pub fn calculate_projection_at(
    data: &RetirementData,
    max_years: Option<u32>,
    strategy: WithdrawalStrategy,
    current_year: i32,
) -> ProjectionResult {
    let Some(birth_year) = parse_birth_year(&data.personal.date_of_birth) else {
        log::debug!("no usable date of birth; returning empty projection");
        return ProjectionResult::default();
    };
    if data.assets.is_empty() {
        log::debug!("no assets; returning empty projection");
        return ProjectionResult::default();
    }
    let Ok(current_age) = u32::try_from(current_year - birth_year) else {
        log::warn!("date of birth {birth_year} is after {current_year}");
        return ProjectionResult::default();
    };

    let spouse_birth_year = parse_birth_year(&data.personal.spouse_date_of_birth);
    let retirement_age = data.personal.retirement_age;
    let assumptions = &data.assumptions;
    let max_age = current_age
        .saturating_add(max_years.unwrap_or(u32::MAX))
        .min(MAX_PROJECTION_AGE);

    let strategy = Strategy::for_kind(strategy, GrowthRates::from_assumptions(assumptions));
    let mut pools = build_pools(&data.assets);
    let mut yearly_data = Vec::new();
    let mut runs_out_at = 0;

    for age in current_age..=max_age {
        let year = birth_year + age as i32;
        let years_from_now = year - current_year;
        let inflation = (1.0 + assumptions.inflation_rate / 100.0).powi(years_from_now);
        let band_multiplier =
            (1.0 + assumptions.tax_band_increase_rate() / 100.0).powi(years_from_now);
        let spouse_age = spouse_birth_year.and_then(|born| u32::try_from(year - born).ok());
        let ages = [Some(age), spouse_age];

        if assumptions.bed_and_isa_enabled() {
            apply_bed_and_isa(&mut pools, ages);
        }
        apply_growth(&mut pools, assumptions, age, retirement_age);
        apply_one_offs(&mut pools, &data.one_offs, ages, inflation);
        apply_market_shock(&mut pools, data.shocks.iter().find(|s| s.year == year));

        let state_pension = ages.map(|a| state_pension_for(a) * inflation);
        let retirement_income = retirement_income_by_owner(&data.retirement_income, year, inflation);
        let base_income = [
            state_pension[PRIMARY] + retirement_income[PRIMARY],
            state_pension[SPOUSE] + retirement_income[SPOUSE],
        ];
        let total_base_income = base_income[PRIMARY] + base_income[SPOUSE];

        let expenditure = if age >= retirement_age {
            expenditure_for(&data.income_needs, retirement_age, age)
                .map_or(0.0, |amount| amount * inflation)
        } else {
            0.0
        };

        let seed = TaxPosition::initial(&data.income_tax, band_multiplier);
        let mut positions = base_income.map(|income| seed.update(income));

        let mut asset_withdrawals = 0.0;
        if age >= retirement_age {
            let cash_deficit: f64 = pools.iter_mut().map(AssetPool::take_cash_deficit).sum();
            let shortfall = expenditure - total_base_income + cash_deficit;
            if shortfall > 0.0 {
                let tax_before = positions.map(|p| p.tax);
                let outcome = strategy.execute(&mut pools, shortfall, &mut positions);
                for ((pool, position), before) in pools.iter_mut().zip(&positions).zip(tax_before) {
                    pool[AssetCategory::Cash] -= position.tax - before;
                }
                asset_withdrawals = outcome.total_withdrawn();
                log::debug!(
                    "{year} age {age}: shortfall {shortfall:.2}, withdrew {asset_withdrawals:.2} in {} rounds, {:.2} unfunded",
                    outcome.rounds,
                    outcome.unfunded
                );
            }
        }

        let combined = combine(&pools);
        let total_assets = combined.total();
        let tax_payable: f64 = positions.iter().map(|p| p.tax).sum();
        let unmet = (expenditure - (total_base_income + asset_withdrawals - tax_payable)).max(0.0);
        yearly_data.push(YearlyDatapoint {
            year,
            age,
            spouse_age,
            assets: total_assets.max(0.0),
            cash: combined[AssetCategory::Cash].max(0.0),
            isa: combined[AssetCategory::Isa].max(0.0),
            pension: (combined[AssetCategory::Pension] + combined[AssetCategory::PensionCrystallised])
                .max(0.0),
            pension_crystallised: combined[AssetCategory::PensionCrystallised].max(0.0),
            stocks_and_shares: combined[AssetCategory::StocksAndShares].max(0.0),
            bonds: combined[AssetCategory::Bonds].max(0.0),
            property: combined[AssetCategory::Property].max(0.0),
            income: total_base_income,
            state_pension: state_pension[PRIMARY] + state_pension[SPOUSE],
            retirement_income: retirement_income[PRIMARY] + retirement_income[SPOUSE],
            expenditure,
            tax_payable,
            asset_withdrawals,
            shortfall: unmet,
        });

        if total_assets <= 0.0 && runs_out_at == 0 && age >= retirement_age {
            runs_out_at = year;
        }
    }

    ProjectionResult {
        yearly_data,
        runs_out_at,
        total_needed: 0.0,
        current_assets: data.assets.iter().map(|a| a.value).sum(),
    }
}

pub fn parse_birth_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(parsed.year());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(parsed.year());
    }
    if date.len() == 4 {
        return date.parse().ok();
    }
    None
}

fn state_pension_for(age: Option<u32>) -> f64 {
    match age {
        Some(age) if age >= STATE_PENSION_AGE => STATE_PENSION_ANNUAL,
        _ => 0.0,
    }
}

fn expenditure_for(needs: &[IncomeNeed], retirement_age: u32, age: u32) -> Option<f64> {
    let mut best: Option<(u32, f64)> = None;
    for need in needs {
        let starts = need.starting_age.unwrap_or(retirement_age);
        if starts > age {
            continue;
        }
        if best.is_none_or(|(best_start, _)| starts > best_start) {
            best = Some((starts, need.annual_amount));
        }
    }
    best.map(|(_, amount)| amount)
}

fn retirement_income_by_owner(incomes: &[RetirementIncome], year: i32, inflation: f64) -> [f64; 2] {
    let mut by_owner = [0.0; 2];
    for income in incomes.iter().filter(|i| i.enabled) {
        let active = year >= income.start_year && income.end_year.is_none_or(|end| year <= end);
        if !active {
            continue;
        }
        let indexation = if income.inflation_adjusted { inflation } else { 1.0 };
        let growth = (1.0 + income.growth_rate.unwrap_or(0.0) / 100.0).powi(year - income.start_year);
        let owner = if income.belongs_to_spouse { SPOUSE } else { PRIMARY };
        by_owner[owner] += income.annual_amount * indexation * growth;
    }
    by_owner
}
