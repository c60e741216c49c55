use serde::{Deserialize, Serialize};

/// Who a request is acting as. A session carries at most one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated { user_id: i64 },
}

impl Identity {
    pub fn from_user_id(user_id: Option<i64>) -> Self {
        match user_id {
            Some(user_id) => Identity::Authenticated { user_id },
            None => Identity::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Authenticated { user_id } => Some(*user_id),
            Identity::Anonymous => None,
        }
    }
}
