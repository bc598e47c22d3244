pub mod attendance;
pub mod role;
pub mod salary_revision;
