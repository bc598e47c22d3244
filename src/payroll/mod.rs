//! Payroll engine: pure, synchronous computations over salary revisions and
//! attendance. Nothing in here touches the database or the HTTP layer.

pub mod attendance;
pub mod compensation;
pub mod cycle;
pub mod day_rules;
pub mod error;
pub mod ledger;
pub mod payslip;
pub mod reconcile;
pub mod summary;

pub use attendance::{AttendanceRecord, DayStatus};
pub use compensation::{CompensationBreakdown, decompose, decompose_str};
pub use cycle::{PayrollCycle, resolve_cycle, resolve_cycle_str};
pub use day_rules::{AllowanceCounters, DayDecision, DayPunch, evaluate_day};
pub use error::{BracketStage, PayrollError, PayrollResult};
pub use ledger::{
    EmployeeLedger, LedgerActor, LedgerGap, LedgerMutation, RevisionEdit, RevisionId, RowWrite,
    SalaryLedger, SalaryRevision,
};
pub use payslip::{Payslip, PayslipExtras, compute_payslip};
pub use reconcile::{AttendanceEdit, reconcile};
pub use summary::{MonthlySummary, aggregate, aggregate_all};
