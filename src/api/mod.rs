pub mod attendance;
pub mod compensation;
pub mod cycle;
pub mod error;
pub mod payslip;
pub mod salary_revision;
