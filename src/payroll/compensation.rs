//! Gross CTC → salary component breakdown.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use utoipa::ToSchema;

use crate::payroll::error::{BracketStage, PayrollError, PayrollResult};

/// City compensatory allowance, fixed by policy.
pub const CCA: i64 = 1000;
/// Transport allowance, fixed by policy.
pub const TRANSPORT_ALLOWANCE: i64 = 1600;

/// Basic pay once consolidated salary reaches [`BASIC_CAP_THRESHOLD`].
pub const BASIC_CAP: i64 = 15_000;
pub const BASIC_CAP_THRESHOLD: i64 = 30_000;
/// Decimal places a gross CTC is kept to, as stored.
pub const CTC_SCALE: u32 = 2;

/// Consolidated salary at which the basic-pay percentage switches; the exact
/// value itself belongs to neither bracket.
pub const BASIC_SPLIT: i64 = 13_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[schema(example = json!({
    "gross_ctc": 15000.0,
    "consolidated_salary": 12757,
    "basic": 6379,
    "hra": 2552,
    "cca": 1000,
    "transport_allowance": 1600,
    "balancing_allowance": 1226
}))]
pub struct CompensationBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    gross_ctc: Decimal,
    consolidated_salary: i64,
    basic: i64,
    hra: i64,
    cca: i64,
    transport_allowance: i64,
    balancing_allowance: i64,
}

impl CompensationBreakdown {
    pub fn gross_ctc(&self) -> Decimal {
        self.gross_ctc
    }

    pub fn consolidated_salary(&self) -> i64 {
        self.consolidated_salary
    }

    pub fn basic(&self) -> i64 {
        self.basic
    }

    pub fn hra(&self) -> i64 {
        self.hra
    }

    pub fn cca(&self) -> i64 {
        self.cca
    }

    pub fn transport_allowance(&self) -> i64 {
        self.transport_allowance
    }

    pub fn balancing_allowance(&self) -> i64 {
        self.balancing_allowance
    }

    /// Fixed allowances exceed what the consolidated salary leaves after basic
    /// and HRA. The negative residual is kept as-is.
    pub fn has_negative_balancing(&self) -> bool {
        self.balancing_allowance < 0
    }

    /// Rebuilds a breakdown loaded from storage and checks the stored
    /// components against a fresh decomposition of the stored CTC.
    pub fn from_stored(
        gross_ctc: Decimal,
        consolidated_salary: i64,
        basic: i64,
        hra: i64,
        balancing_allowance: i64,
    ) -> PayrollResult<Self> {
        let fresh = decompose(gross_ctc)?;
        if fresh.consolidated_salary != consolidated_salary
            || fresh.basic != basic
            || fresh.hra != hra
            || fresh.balancing_allowance != balancing_allowance
        {
            return Err(PayrollError::integrity(format!(
                "stored components for CTC {gross_ctc} do not match its decomposition"
            )));
        }
        Ok(fresh)
    }
}

pub(crate) fn round_whole(value: Decimal) -> PayrollResult<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PayrollError::invalid(format!("{value} is out of range")))
}

/// Step 1: consolidated (monthly) salary from the gross CTC bracket.
pub fn consolidated_salary(gross_ctc: Decimal) -> PayrollResult<i64> {
    let consolidated = if gross_ctc < dec!(15285) {
        gross_ctc / dec!(1.1758)
    } else if gross_ctc <= dec!(23757) {
        gross_ctc / dec!(1.1638)
    } else if gross_ctc <= dec!(34298) {
        gross_ctc / dec!(1.1313)
    } else if gross_ctc >= dec!(34299) {
        (gross_ctc - dec!(1800)) / dec!(1.0833)
    } else {
        return Err(PayrollError::AmbiguousBracket {
            stage: BracketStage::ConsolidatedSalary,
            value: gross_ctc.to_string(),
        });
    };
    round_whole(consolidated)
}

/// Step 2: basic pay from consolidated salary.
pub fn basic_pay(consolidated: i64) -> PayrollResult<i64> {
    if consolidated >= BASIC_CAP_THRESHOLD {
        return Ok(BASIC_CAP);
    }
    let share = match consolidated.cmp(&BASIC_SPLIT) {
        std::cmp::Ordering::Greater => dec!(0.4),
        std::cmp::Ordering::Less => dec!(0.5),
        std::cmp::Ordering::Equal => {
            return Err(PayrollError::AmbiguousBracket {
                stage: BracketStage::Basic,
                value: consolidated.to_string(),
            });
        }
    };
    round_whole(Decimal::from(consolidated) * share)
}

/// Decomposes a gross CTC into its salary components.
///
/// The balancing allowance is whatever remains of the consolidated salary after
/// basic, HRA and the fixed allowances, so the components always sum back to
/// the consolidated figure. The CTC is rounded to [`CTC_SCALE`] places before
/// bracket selection, so a stored breakdown decomposes back to itself.
pub fn decompose(gross_ctc: Decimal) -> PayrollResult<CompensationBreakdown> {
    let gross_ctc =
        gross_ctc.round_dp_with_strategy(CTC_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if gross_ctc <= Decimal::ZERO {
        return Err(PayrollError::invalid(format!(
            "gross CTC must be positive, got {gross_ctc}"
        )));
    }

    let consolidated = consolidated_salary(gross_ctc)?;
    if consolidated <= 0 {
        return Err(PayrollError::invalid(format!(
            "gross CTC {gross_ctc} is too small to yield a consolidated salary"
        )));
    }

    let basic = basic_pay(consolidated)?;
    let hra = round_whole(Decimal::from(basic) * dec!(0.4))?;
    let balancing_allowance = consolidated - (basic + hra + CCA + TRANSPORT_ALLOWANCE);

    Ok(CompensationBreakdown {
        gross_ctc,
        consolidated_salary: consolidated,
        basic,
        hra,
        cca: CCA,
        transport_allowance: TRANSPORT_ALLOWANCE,
        balancing_allowance,
    })
}

/// [`decompose`] over a raw textual amount, e.g. a form field.
pub fn decompose_str(gross_ctc: &str) -> PayrollResult<CompensationBreakdown> {
    let parsed: Decimal = gross_ctc
        .trim()
        .parse()
        .map_err(|_| PayrollError::invalid(format!("'{gross_ctc}' is not a number")))?;
    decompose(parsed)
}
