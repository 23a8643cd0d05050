use super::pool::{AssetPool, PRIMARY, SPOUSE};
use super::types::{AssetCategory, OneOff};

pub const BED_AND_ISA_MIN_AGE: u32 = 55;
pub const ANNUAL_ISA_ALLOWANCE: f64 = 20_000.0;
pub const TAX_FREE_LUMP_SUM_SHARE: f64 = 0.25;

pub const CRYSTALLISATION_TARGET: f64 = ANNUAL_ISA_ALLOWANCE / TAX_FREE_LUMP_SUM_SHARE;

/// Yearly "Bed and ISA": each eligible owner crystallises up to
/// `CRYSTALLISATION_TARGET`, 25% into their ISA and 75% into crystallised
/// pension. A short own pension is topped up from the other pool's
/// uncrystallised pension. Owners are processed primary first, each seeing
/// the balances left by the one before.
pub fn apply_bed_and_isa(pools: &mut [AssetPool; 2], ages: [Option<u32>; 2]) {
    for owner in [PRIMARY, SPOUSE] {
        let eligible = ages[owner].is_some_and(|age| age >= BED_AND_ISA_MIN_AGE);
        if !eligible {
            continue;
        }
        let other = 1 - owner;

        let from_own = pools[owner][AssetCategory::Pension]
            .max(0.0)
            .min(CRYSTALLISATION_TARGET);
        let still_needed = CRYSTALLISATION_TARGET - from_own;
        let from_other = if still_needed > 0.0 {
            pools[other][AssetCategory::Pension].max(0.0).min(still_needed)
        } else {
            0.0
        };

        let crystallised = from_own + from_other;
        if crystallised <= 0.0 {
            continue;
        }

        pools[owner][AssetCategory::Pension] -= from_own;
        pools[other][AssetCategory::Pension] -= from_other;
        pools[owner][AssetCategory::Isa] += crystallised * TAX_FREE_LUMP_SUM_SHARE;
        pools[owner][AssetCategory::PensionCrystallised] +=
            crystallised * (1.0 - TAX_FREE_LUMP_SUM_SHARE);
    }
}

pub fn apply_one_offs(
    pools: &mut [AssetPool; 2],
    one_offs: &[OneOff],
    ages: [Option<u32>; 2],
    inflation_multiplier: f64,
) {
    for one_off in one_offs.iter().filter(|o| o.enabled) {
        let owner = if one_off.belongs_to_spouse { SPOUSE } else { PRIMARY };
        if ages[owner] == Some(one_off.age) {
            pools[owner][AssetCategory::Cash] += one_off.amount * inflation_multiplier;
        }
    }
}
