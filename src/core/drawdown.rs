use super::growth::GrowthRates;
use super::pool::AssetPool;
use super::tax::TaxPosition;
use super::types::{AssetCategory, WithdrawalStrategy};

pub const MAX_CONVERGENCE_ROUNDS: usize = 10;
const SETTLED_EPS: f64 = 1e-9;
const BALANCED_SWEEP_THRESHOLD: f64 = 0.01;

const TAX_OPTIMIZED_ORDER: [AssetCategory; 6] = [
    AssetCategory::Cash,
    AssetCategory::Bonds,
    AssetCategory::StocksAndShares,
    AssetCategory::Pension,
    AssetCategory::PensionCrystallised,
    AssetCategory::Property,
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssetDrawdownResult {
    pub remaining: f64,
    pub taxable_withdrawn: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownOutcome {
    pub withdrawn: Vec<f64>,
    pub unfunded: f64,
    pub rounds: usize,
}

impl DrawdownOutcome {
    pub fn total_withdrawn(&self) -> f64 {
        self.withdrawn.iter().sum()
    }
}

pub trait DrawdownStrategy {
    fn withdraw_from_assets(
        &self,
        pool: &mut AssetPool,
        amount: f64,
        position: &TaxPosition,
    ) -> AssetDrawdownResult;

    /// Funds `shortfall` plus the tax already accrued on `positions` from the
    /// pools, splitting the outstanding need equally across every pool that
    /// still holds assets, for at most `MAX_CONVERGENCE_ROUNDS` rounds.
    fn execute(
        &self,
        pools: &mut [AssetPool],
        shortfall: f64,
        positions: &mut [TaxPosition],
    ) -> DrawdownOutcome {
        debug_assert_eq!(pools.len(), positions.len());
        let mut needed = shortfall + positions.iter().map(|p| p.tax).sum::<f64>();
        let mut withdrawn = vec![0.0; pools.len()];
        let mut rounds = 0;

        while rounds < MAX_CONVERGENCE_ROUNDS && needed > SETTLED_EPS {
            let active: Vec<usize> = pools
                .iter()
                .enumerate()
                .filter(|(_, pool)| pool.has_assets())
                .map(|(idx, _)| idx)
                .collect();
            if active.is_empty() {
                break;
            }

            rounds += 1;
            let share = needed / active.len() as f64;
            for idx in active {
                let result = self.withdraw_from_assets(&mut pools[idx], share, &positions[idx]);
                let taken = share - result.remaining;
                positions[idx] = positions[idx].update(result.taxable_withdrawn);
                withdrawn[idx] += taken;
                needed -= taken;
            }
        }

        let unfunded = needed.max(0.0);
        if rounds == MAX_CONVERGENCE_ROUNDS
            && unfunded > SETTLED_EPS
            && pools.iter().any(AssetPool::has_assets)
        {
            log::warn!(
                "drawdown did not converge after {MAX_CONVERGENCE_ROUNDS} rounds; {unfunded:.2} left unfunded"
            );
        }

        DrawdownOutcome {
            withdrawn,
            unfunded,
            rounds,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BalancedStrategy;

impl DrawdownStrategy for BalancedStrategy {
    fn withdraw_from_assets(
        &self,
        pool: &mut AssetPool,
        amount: f64,
        _position: &TaxPosition,
    ) -> AssetDrawdownResult {
        if amount <= 0.0 {
            return AssetDrawdownResult::default();
        }
        let total = pool.positive_total();
        if total <= 0.0 {
            return AssetDrawdownResult {
                remaining: amount,
                taxable_withdrawn: 0.0,
            };
        }

        let mut result = AssetDrawdownResult {
            remaining: amount,
            taxable_withdrawn: 0.0,
        };
        let targets: Vec<(AssetCategory, f64)> = pool
            .iter()
            .filter(|&(_, balance)| balance > 0.0)
            .map(|(category, balance)| (category, (amount * balance / total).min(balance)))
            .collect();
        for (category, withdrawal) in targets {
            take(pool, category, withdrawal, &mut result);
        }

        if result.remaining > BALANCED_SWEEP_THRESHOLD {
            for category in AssetCategory::ALL {
                if result.remaining <= 0.0 {
                    break;
                }
                let withdrawal = result.remaining.min(pool[category].max(0.0));
                take(pool, category, withdrawal, &mut result);
            }
        }

        result.remaining = result.remaining.max(0.0);
        result
    }
}

fn take(
    pool: &mut AssetPool,
    category: AssetCategory,
    withdrawal: f64,
    result: &mut AssetDrawdownResult,
) {
    pool[category] -= withdrawal;
    result.remaining -= withdrawal;
    if category.is_taxable() {
        result.taxable_withdrawn += withdrawal;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LowestGrowthFirstStrategy {
    pub growth_rates: GrowthRates,
}

impl DrawdownStrategy for LowestGrowthFirstStrategy {
    fn withdraw_from_assets(
        &self,
        pool: &mut AssetPool,
        amount: f64,
        _position: &TaxPosition,
    ) -> AssetDrawdownResult {
        if amount <= 0.0 {
            return AssetDrawdownResult::default();
        }

        let mut ordered: Vec<AssetCategory> = AssetCategory::ALL
            .into_iter()
            .filter(|&category| pool[category] > 0.0)
            .collect();
        // Stable, so equal rates keep enumeration order.
        ordered.sort_by(|a, b| {
            self.growth_rates
                .rate(*a)
                .total_cmp(&self.growth_rates.rate(*b))
        });

        let mut result = AssetDrawdownResult {
            remaining: amount,
            taxable_withdrawn: 0.0,
        };
        for category in ordered {
            if result.remaining <= 0.0 {
                break;
            }
            let withdrawal = result.remaining.min(pool[category].max(0.0));
            take(pool, category, withdrawal, &mut result);
        }

        result.remaining = result.remaining.max(0.0);
        result
    }
}

/// Keeps non-ISA draws inside the room below the higher-rate threshold and
/// covers the rest from the ISA before going past the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxOptimizedStrategy;

impl DrawdownStrategy for TaxOptimizedStrategy {
    fn withdraw_from_assets(
        &self,
        pool: &mut AssetPool,
        amount: f64,
        position: &TaxPosition,
    ) -> AssetDrawdownResult {
        if amount <= 0.0 {
            return AssetDrawdownResult::default();
        }

        let room = position.room_before_higher_rate();
        let mut remaining = amount;
        let mut taxable_withdrawn = 0.0;

        for category in TAX_OPTIMIZED_ORDER {
            let cap = (room - taxable_withdrawn).max(0.0);
            if remaining <= 0.0 || cap <= 0.0 {
                break;
            }
            let withdrawal = remaining.min(pool[category].max(0.0)).min(cap);
            pool[category] -= withdrawal;
            remaining -= withdrawal;
            taxable_withdrawn += withdrawal;
        }

        if remaining > 0.0 {
            let withdrawal = remaining.min(pool[AssetCategory::Isa].max(0.0));
            pool[AssetCategory::Isa] -= withdrawal;
            remaining -= withdrawal;
        }

        for category in TAX_OPTIMIZED_ORDER {
            if remaining <= 0.0 {
                break;
            }
            let withdrawal = remaining.min(pool[category].max(0.0));
            pool[category] -= withdrawal;
            remaining -= withdrawal;
            taxable_withdrawn += withdrawal;
        }

        AssetDrawdownResult {
            remaining: remaining.max(0.0),
            taxable_withdrawn,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    Balanced(BalancedStrategy),
    LowestGrowthFirst(LowestGrowthFirstStrategy),
    TaxOptimized(TaxOptimizedStrategy),
}

impl Strategy {
    pub fn for_kind(kind: WithdrawalStrategy, growth_rates: GrowthRates) -> Self {
        match kind {
            WithdrawalStrategy::Balanced => Strategy::Balanced(BalancedStrategy),
            WithdrawalStrategy::LowestGrowthFirst => {
                Strategy::LowestGrowthFirst(LowestGrowthFirstStrategy { growth_rates })
            }
            WithdrawalStrategy::TaxOptimized => Strategy::TaxOptimized(TaxOptimizedStrategy),
        }
    }

    pub fn kind(&self) -> WithdrawalStrategy {
        match self {
            Strategy::Balanced(_) => WithdrawalStrategy::Balanced,
            Strategy::LowestGrowthFirst(_) => WithdrawalStrategy::LowestGrowthFirst,
            Strategy::TaxOptimized(_) => WithdrawalStrategy::TaxOptimized,
        }
    }
}

impl DrawdownStrategy for Strategy {
    fn withdraw_from_assets(
        &self,
        pool: &mut AssetPool,
        amount: f64,
        position: &TaxPosition,
    ) -> AssetDrawdownResult {
        match self {
            Strategy::Balanced(s) => s.withdraw_from_assets(pool, amount, position),
            Strategy::LowestGrowthFirst(s) => s.withdraw_from_assets(pool, amount, position),
            Strategy::TaxOptimized(s) => s.withdraw_from_assets(pool, amount, position),
        }
    }
}
