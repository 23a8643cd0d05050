use std::ops::{Index, IndexMut};

use super::types::{Asset, AssetCategory};

pub const PRIMARY: usize = 0;
pub const SPOUSE: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssetPool {
    balances: [f64; AssetCategory::ALL.len()],
}

impl AssetPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balances(balances: &[(AssetCategory, f64)]) -> Self {
        let mut pool = Self::new();
        for &(category, value) in balances {
            pool[category] += value;
        }
        pool
    }

    pub fn total(&self) -> f64 {
        self.balances.iter().sum()
    }

    pub fn positive_total(&self) -> f64 {
        self.balances.iter().map(|b| b.max(0.0)).sum()
    }

    pub fn has_assets(&self) -> bool {
        self.positive_total() > 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, f64)> + '_ {
        AssetCategory::ALL.iter().map(|&c| (c, self[c]))
    }

    pub fn take_cash_deficit(&mut self) -> f64 {
        let cash = self[AssetCategory::Cash];
        if cash < 0.0 {
            self[AssetCategory::Cash] = 0.0;
            -cash
        } else {
            0.0
        }
    }
}

impl Index<AssetCategory> for AssetPool {
    type Output = f64;

    fn index(&self, category: AssetCategory) -> &f64 {
        &self.balances[category.index()]
    }
}

impl IndexMut<AssetCategory> for AssetPool {
    fn index_mut(&mut self, category: AssetCategory) -> &mut f64 {
        &mut self.balances[category.index()]
    }
}

pub fn build_pools(assets: &[Asset]) -> [AssetPool; 2] {
    let mut pools = [AssetPool::new(), AssetPool::new()];
    for asset in assets {
        let owner = if asset.belongs_to_spouse { SPOUSE } else { PRIMARY };
        pools[owner][asset.category] += asset.value;
    }
    pools
}

pub fn combine(pools: &[AssetPool]) -> AssetPool {
    let mut combined = AssetPool::new();
    for pool in pools {
        for (category, value) in pool.iter() {
            combined[category] += value;
        }
    }
    combined
}
