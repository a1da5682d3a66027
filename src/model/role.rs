use serde::{Deserialize, Serialize};

/// Role flags carried by every user. A user may hold several at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub is_owner: bool,
    pub is_trainer: bool,
    pub is_member: bool,
}

impl Roles {
    pub fn member() -> Self {
        Self {
            is_member: true,
            ..Self::default()
        }
    }

    pub fn trainer() -> Self {
        Self {
            is_trainer: true,
            ..Self::default()
        }
    }

    pub fn owner() -> Self {
        Self {
            is_owner: true,
            ..Self::default()
        }
    }

    /// Owners and trainers may manage other people's attendance.
    pub fn is_staff(&self) -> bool {
        self.is_owner || self.is_trainer
    }
}

/// The authenticated caller as seen by the attendance core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: u64,
    pub roles: Roles,
}

impl Principal {
    pub fn new(user_id: u64, roles: Roles) -> Self {
        Self { user_id, roles }
    }

    pub fn require_staff(&self, action: &str) -> crate::error::Result<()> {
        if self.roles.is_staff() {
            Ok(())
        } else {
            Err(crate::error::AppError::Forbidden(format!(
                "Only owners and trainers can {action}"
            )))
        }
    }
}
