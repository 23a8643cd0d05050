mod drawdown;
mod engine;
mod growth;
mod pool;
mod summary;
mod tax;
mod transfers;
mod types;

pub use drawdown::{
    AssetDrawdownResult, BalancedStrategy, DrawdownOutcome, DrawdownStrategy,
    LowestGrowthFirstStrategy, MAX_CONVERGENCE_ROUNDS, Strategy, TaxOptimizedStrategy,
};
pub use engine::{
    MAX_PROJECTION_AGE, STATE_PENSION_AGE, STATE_PENSION_ANNUAL, calculate_projection,
    calculate_projection_at, parse_birth_year,
};
pub use growth::{GrowthRates, apply_growth, apply_market_shock, equity_weight, isa_growth_rate};
pub use pool::{AssetPool, PRIMARY, SPOUSE, build_pools, combine};
pub use summary::{compare_strategies, summarize};
pub use tax::{BASIC_RATE, HIGHER_RATE, TaxPosition};
pub use transfers::{
    ANNUAL_ISA_ALLOWANCE, BED_AND_ISA_MIN_AGE, CRYSTALLISATION_TARGET, TAX_FREE_LUMP_SUM_SHARE,
    apply_bed_and_isa, apply_one_offs,
};
pub use types::{
    Asset, AssetCategory, Assumptions, GrowthClass, IncomeNeed, InvestmentBalance, MarketShock,
    OneOff, Outlook, PersonalInfo, ProjectionResult, ProjectionSummary, RetirementData,
    RetirementIncome, StrategyComparison, TaxSettings, WithdrawalStrategy, YearlyDatapoint,
};
