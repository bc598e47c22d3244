use thiserror::Error;

use crate::payroll::cycle::PayrollCycle;

/// Which decomposition step hit an undefined bracket boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum BracketStage {
    #[strum(serialize = "consolidated salary")]
    ConsolidatedSalary,
    #[strum(serialize = "basic")]
    Basic,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayrollError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage} bracket is undefined for {value}")]
    AmbiguousBracket { stage: BracketStage, value: String },

    #[error("ledger integrity violation: {0}")]
    LedgerIntegrityViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no attendance records for {emp_id} in cycle {cycle}")]
    EmptyCycle { emp_id: String, cycle: PayrollCycle },

    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl PayrollError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PayrollError::InvalidInput(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        PayrollError::LedgerIntegrityViolation(msg.into())
    }

    /// Stable machine-readable name, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PayrollError::InvalidInput(_) => "InvalidInput",
            PayrollError::AmbiguousBracket { .. } => "AmbiguousBracket",
            PayrollError::LedgerIntegrityViolation(_) => "LedgerIntegrityViolation",
            PayrollError::NotFound(_) => "NotFound",
            PayrollError::EmptyCycle { .. } => "EmptyCycle",
            PayrollError::Forbidden(_) => "Forbidden",
        }
    }

    /// `EmptyCycle` means "no data yet" and callers render it as an empty result.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PayrollError::EmptyCycle { .. })
    }
}

pub type PayrollResult<T> = Result<T, PayrollError>;
