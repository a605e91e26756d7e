//! Identity collaborator.
//!
//! The pipeline consumes an already-authenticated user id as an opaque string
//! and performs no validation of it.

/// Supplies the id of the user on whose behalf a file is uploaded.
pub trait IdentityProvider: Send + Sync {
    /// Opaque user id, or `None` when no user is signed in.
    fn user_id(&self) -> Option<String>;
}

/// Identity fixed at construction (CLI flags, service accounts, tests).
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }
}

/// No signed-in user; records are stored with an empty user id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn user_id(&self) -> Option<String> {
        None
    }
}
