use serde::Serialize;

use crate::User;

/// What the rest of the service knows about the current visitor.
///
/// `loading` is true only before the session lookup has completed; guarded
/// routes must not decide anything while it is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub loading: bool,
}

impl SessionContext {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            loading: false,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            loading: false,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}
