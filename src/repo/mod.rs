pub mod attendance;
pub mod salary_history;
