use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::UserIdError;
use crate::user::errors::ValidationError;

/// User aggregate entity.
///
/// Represents a registered user together with the bearer tokens of every
/// session it currently has open.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: UserName,
    pub email: EmailAddress,
    pub password_hash: String,
    /// Issued tokens, oldest first.
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether `token` is one of this user's live session tokens.
    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type
///
/// Surrounding whitespace is trimmed; the remainder must not be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    /// Create a new valid name.
    ///
    /// # Errors
    /// * `EmptyName` - Name is empty or whitespace only
    pub fn new(name: String) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Stored trimmed and lowercased, so lookups by email are case-insensitive.
/// Validates format using an RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new normalized, validated email address.
    ///
    /// # Errors
    /// * `InvalidEmail` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, ValidationError> {
        let normalized = email.trim().to_lowercase();

        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| ValidationError::InvalidEmail(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password that satisfies the length policy.
///
/// Only ever lives long enough to be hashed; `Debug` never prints it.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub const MIN_LENGTH: usize = 7;

    /// # Errors
    /// * `PasswordTooShort` - Fewer than 7 characters
    pub fn new(password: String) -> Result<Self, ValidationError> {
        let actual = password.chars().count();
        if actual < Self::MIN_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: Self::MIN_LENGTH,
                actual,
            });
        }
        Ok(Self(password))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Command to register a new user with domain types
#[derive(Debug)]
pub struct RegisterUserCommand {
    pub name: UserName,
    pub email: EmailAddress,
    pub password: Password,
}

impl RegisterUserCommand {
    /// Validate raw registration input.
    ///
    /// # Errors
    /// * `ValidationError` - First field that fails its rule
    pub fn new(name: String, email: String, password: String) -> Result<Self, ValidationError> {
        Ok(Self {
            name: UserName::new(name)?,
            email: EmailAddress::new(email)?,
            password: Password::new(password)?,
        })
    }
}

/// Login attempt with raw credentials.
///
/// Left unvalidated: a syntactically bad email is reported exactly like an
/// unknown one.
#[derive(Debug)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Command to update an existing user with optional validated fields.
///
/// Only provided fields will be updated. A password is re-hashed only when
/// one is provided here.
#[derive(Debug, Default)]
pub struct UpdateUserCommand {
    pub name: Option<UserName>,
    pub email: Option<EmailAddress>,
    pub password: Option<Password>,
}

impl UpdateUserCommand {
    pub fn new(
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: name.map(UserName::new).transpose()?,
            email: email.map(EmailAddress::new).transpose()?,
            password: password.map(Password::new).transpose()?,
        })
    }
}
