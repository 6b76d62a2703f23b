use async_trait::async_trait;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub token: String,
}

/// Port for user domain service operations.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Register a new user and open its first session.
    ///
    /// # Arguments
    /// * `command` - Validated command containing name, email, and password
    ///
    /// # Returns
    /// Stored user (its token list holds the returned token) and the token
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Password` / `Token` / `DatabaseError` - Internal failure
    async fn register(&self, command: RegisterUserCommand)
        -> Result<AuthenticatedSession, UserError>;

    /// Check credentials and open a new session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email or wrong password (indistinguishable)
    /// * `Password` / `Token` / `DatabaseError` - Internal failure
    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, UserError>;

    /// Resolve an `Authorization` header value to the user owning the token.
    ///
    /// # Arguments
    /// * `header` - Raw header value, expected as `Bearer <token>`
    ///
    /// # Errors
    /// * `MissingOrMalformedHeader` - No `Bearer ` prefix
    /// * `Unauthorized` - Bad signature, or token no longer listed on its user
    /// * `DatabaseError` - Database operation failed
    async fn authorize(&self, header: &str) -> Result<User, UserError>;

    /// Update existing user with optional fields.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `EmailAlreadyExists` - New email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn update_user(&self, id: &UserId, command: UpdateUserCommand)
        -> Result<User, UserError>;
}

/// Persistence operations for user aggregate.
///
/// Implementations own the uniqueness of `email` and must make
/// `append_token` atomic with respect to concurrent appends on the same user.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist new user to storage.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve user by identifier.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve user by (normalized) email address.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError>;

    /// Retrieve user by identifier, only if `token` is in its token list.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id_and_token(
        &self,
        id: &UserId,
        token: &str,
    ) -> Result<Option<User>, UserError>;

    /// Append `token` to the user's token list.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `DatabaseError` - Database operation failed
    async fn append_token(&self, id: &UserId, token: &str) -> Result<(), UserError>;

    /// Write name, email and password hash. The token list is left untouched.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `EmailAlreadyExists` - New email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn update_profile(&self, user: User) -> Result<User, UserError>;
}
