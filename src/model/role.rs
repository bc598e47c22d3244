#[derive(Debug, Copy, Clone, Eq, PartialEq, strum_macros::Display)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// Add and edit salary revisions, and reconcile attendance.
    pub fn can_revise_payroll(self) -> bool {
        matches!(self, Role::Admin | Role::Hr | Role::System)
    }

    /// Delete salary revisions.
    pub fn can_remove_revisions(self) -> bool {
        matches!(self, Role::Admin | Role::System)
    }

    /// Read any employee's payroll data.
    pub fn can_read_all(self) -> bool {
        !matches!(self, Role::Employee)
    }
}
