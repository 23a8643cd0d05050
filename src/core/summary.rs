use rayon::prelude::*;

use super::engine::calculate_projection_at;
use super::types::{
    Outlook, ProjectionResult, ProjectionSummary, RetirementData, StrategyComparison,
    WithdrawalStrategy,
};

pub const SUSTAINABLE_YEARS: i32 = 30;
pub const WARNING_YEARS: i32 = 15;

pub fn summarize(result: &ProjectionResult, data: &RetirementData) -> ProjectionSummary {
    let retirement_age = data.personal.retirement_age;
    let first_year = result.yearly_data.first().map(|d| d.year);
    let assets_at_retirement = result
        .yearly_data
        .iter()
        .find(|d| d.age >= retirement_age)
        .map_or(0.0, |d| d.assets);

    let runs_out_at = (result.runs_out_at != 0).then_some(result.runs_out_at);
    let runs_out_at_age = runs_out_at.and_then(|year| {
        result
            .yearly_data
            .iter()
            .find(|d| d.year == year)
            .map(|d| d.age)
    });
    let years_remaining = runs_out_at.zip(first_year).map(|(end, start)| end - start);

    ProjectionSummary {
        current_assets: result.current_assets,
        assets_at_retirement,
        runs_out_at,
        runs_out_at_age,
        years_remaining,
        outlook: outlook_for(years_remaining),
    }
}

fn outlook_for(years_remaining: Option<i32>) -> Outlook {
    match years_remaining {
        None => Outlook::Sustainable,
        Some(years) if years > SUSTAINABLE_YEARS => Outlook::Sustainable,
        Some(years) if years > WARNING_YEARS => Outlook::Warning,
        Some(_) => Outlook::Danger,
    }
}

pub fn compare_strategies(
    data: &RetirementData,
    max_years: Option<u32>,
    current_year: i32,
) -> Vec<StrategyComparison> {
    WithdrawalStrategy::ALL
        .par_iter()
        .map(|&strategy| {
            let result = calculate_projection_at(data, max_years, strategy, current_year);
            StrategyComparison {
                strategy,
                summary: summarize(&result, data),
                result,
            }
        })
        .collect()
}
