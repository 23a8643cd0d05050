use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetCategory {
    Pension,
    PensionCrystallised,
    Cash,
    #[serde(rename = "stocks", alias = "stocksAndShares")]
    StocksAndShares,
    #[serde(alias = "ISA")]
    Isa,
    Bonds,
    Property,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 7] = [
        AssetCategory::Pension,
        AssetCategory::PensionCrystallised,
        AssetCategory::Cash,
        AssetCategory::StocksAndShares,
        AssetCategory::Isa,
        AssetCategory::Bonds,
        AssetCategory::Property,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            AssetCategory::Pension => 0,
            AssetCategory::PensionCrystallised => 1,
            AssetCategory::Cash => 2,
            AssetCategory::StocksAndShares => 3,
            AssetCategory::Isa => 4,
            AssetCategory::Bonds => 5,
            AssetCategory::Property => 6,
        }
    }

    pub fn growth_class(self) -> GrowthClass {
        match self {
            AssetCategory::Pension | AssetCategory::PensionCrystallised => GrowthClass::Pension,
            AssetCategory::Cash => GrowthClass::Cash,
            AssetCategory::StocksAndShares | AssetCategory::Isa => GrowthClass::Stocks,
            AssetCategory::Bonds => GrowthClass::Bonds,
            AssetCategory::Property => GrowthClass::Property,
        }
    }

    pub fn is_taxable(self) -> bool {
        matches!(
            self,
            AssetCategory::Pension | AssetCategory::PensionCrystallised
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GrowthClass {
    Pension,
    Cash,
    Stocks,
    Bonds,
    Property,
    Other,
}

impl GrowthClass {
    pub fn key(self) -> &'static str {
        match self {
            GrowthClass::Pension => "pension",
            GrowthClass::Cash => "cash",
            GrowthClass::Stocks => "stocks",
            GrowthClass::Bonds => "bonds",
            GrowthClass::Property => "property",
            GrowthClass::Other => "other",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStrategy {
    #[default]
    Balanced,
    #[serde(alias = "lowest-growth-first", alias = "lowestGrowthFirst")]
    LowestGrowthFirst,
    #[serde(alias = "tax-optimized", alias = "taxOptimized", alias = "tax_optimised")]
    TaxOptimized,
}

impl WithdrawalStrategy {
    pub const ALL: [WithdrawalStrategy; 3] = [
        WithdrawalStrategy::Balanced,
        WithdrawalStrategy::LowestGrowthFirst,
        WithdrawalStrategy::TaxOptimized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStrategy::Balanced => "balanced",
            WithdrawalStrategy::LowestGrowthFirst => "lowest_growth_first",
            WithdrawalStrategy::TaxOptimized => "tax_optimized",
        }
    }
}

impl fmt::Display for WithdrawalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "balanced" => Ok(WithdrawalStrategy::Balanced),
            "lowest_growth_first" | "lowestgrowthfirst" => Ok(WithdrawalStrategy::LowestGrowthFirst),
            "tax_optimized" | "tax_optimised" | "taxoptimized" => {
                Ok(WithdrawalStrategy::TaxOptimized)
            }
            other => Err(format!("unknown withdrawal strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub date_of_birth: String,
    pub spouse_date_of_birth: String,
    pub retirement_age: u32,
}

impl Default for PersonalInfo {
    fn default() -> Self {
        Self {
            date_of_birth: String::new(),
            spouse_date_of_birth: String::new(),
            retirement_age: 65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub value: f64,
    pub category: AssetCategory,
    #[serde(default)]
    pub belongs_to_spouse: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeNeed {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub annual_amount: f64,
    #[serde(default)]
    pub starting_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementIncome {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub annual_amount: f64,
    pub start_year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub inflation_adjusted: bool,
    #[serde(default)]
    pub growth_rate: Option<f64>,
    #[serde(default)]
    pub belongs_to_spouse: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShock {
    #[serde(default)]
    pub id: String,
    pub year: i32,
    pub impact_percent: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneOff {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    pub age: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub belongs_to_spouse: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentBalance {
    pub initial_equity_percentage: f64,
    pub target_equity_percentage: f64,
    pub years_to_target: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assumptions {
    pub inflation_rate: f64,
    pub category_growth_rates: HashMap<String, f64>,
    pub tax_band_increase_rate: Option<f64>,
    #[serde(rename = "bedAndISAEnabled", alias = "bedAndIsaEnabled")]
    pub bed_and_isa_enabled: Option<bool>,
    pub investment_balance: Option<InvestmentBalance>,
    pub investment_balance_enabled: Option<bool>,
}

impl Assumptions {
    pub fn growth_rate(&self, class: GrowthClass) -> f64 {
        self.category_growth_rates
            .get(class.key())
            .copied()
            .unwrap_or(0.0)
            / 100.0
    }

    pub fn tax_band_increase_rate(&self) -> f64 {
        self.tax_band_increase_rate.unwrap_or(self.inflation_rate)
    }

    pub fn bed_and_isa_enabled(&self) -> bool {
        self.bed_and_isa_enabled.unwrap_or(false)
    }

    pub fn glide_path(&self) -> Option<&InvestmentBalance> {
        if self.investment_balance_enabled.unwrap_or(true) {
            self.investment_balance.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxSettings {
    pub personal_allowance: f64,
    pub higher_rate_threshold: f64,
}

impl Default for TaxSettings {
    fn default() -> Self {
        Self {
            personal_allowance: 12_570.0,
            higher_rate_threshold: 50_270.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementData {
    #[serde(default)]
    pub personal: PersonalInfo,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub income_needs: Vec<IncomeNeed>,
    #[serde(default)]
    pub retirement_income: Vec<RetirementIncome>,
    #[serde(default)]
    pub assumptions: Assumptions,
    #[serde(default)]
    pub income_tax: TaxSettings,
    #[serde(default)]
    pub shocks: Vec<MarketShock>,
    #[serde(default)]
    pub one_offs: Vec<OneOff>,
}

impl Default for RetirementData {
    fn default() -> Self {
        Self {
            personal: PersonalInfo::default(),
            assets: Vec::new(),
            income_needs: Vec::new(),
            retirement_income: Vec::new(),
            assumptions: Assumptions {
                inflation_rate: 2.5,
                category_growth_rates: HashMap::new(),
                tax_band_increase_rate: None,
                bed_and_isa_enabled: None,
                investment_balance: Some(InvestmentBalance {
                    initial_equity_percentage: 80.0,
                    target_equity_percentage: 50.0,
                    years_to_target: 30,
                }),
                investment_balance_enabled: Some(true),
            },
            income_tax: TaxSettings::default(),
            shocks: Vec::new(),
            one_offs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyDatapoint {
    pub year: i32,
    pub age: u32,
    pub spouse_age: Option<u32>,
    pub assets: f64,
    pub cash: f64,
    pub isa: f64,
    pub pension: f64,
    pub pension_crystallised: f64,
    pub stocks_and_shares: f64,
    pub bonds: f64,
    pub property: f64,
    pub income: f64,
    pub state_pension: f64,
    pub retirement_income: f64,
    pub expenditure: f64,
    pub tax_payable: f64,
    pub asset_withdrawals: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub yearly_data: Vec<YearlyDatapoint>,
    pub runs_out_at: i32,
    pub total_needed: f64,
    pub current_assets: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Sustainable,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub current_assets: f64,
    pub assets_at_retirement: f64,
    pub runs_out_at: Option<i32>,
    pub runs_out_at_age: Option<u32>,
    pub years_remaining: Option<i32>,
    pub outlook: Outlook,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub strategy: WithdrawalStrategy,
    pub summary: ProjectionSummary,
    pub result: ProjectionResult,
}
