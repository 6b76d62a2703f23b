use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Bearer token payload.
///
/// Binds a subject (the user identifier) and the issue time. There is
/// deliberately no `exp`: a token stays valid until its owner's record
/// stops listing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Create claims for a subject, issued now.
    pub fn for_subject(sub: impl ToString) -> Self {
        Self {
            sub: sub.to_string(),
            iat: Utc::now().timestamp(),
        }
    }

    /// Set issued at (Unix timestamp).
    pub fn with_issued_at(mut self, iat: i64) -> Self {
        self.iat = iat;
        self
    }
}
