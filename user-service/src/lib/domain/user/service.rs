use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::AuthenticatedSession;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

const BEARER_PREFIX: &str = "Bearer ";

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
/// Holds no mutable state of its own; every invariant on stored users is
/// enforced by the repository.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token signing, configured once at startup
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Run password hashing work on the blocking pool.
    ///
    /// Argon2 is CPU and memory bound and must not run on a runtime worker.
    async fn with_authenticator<T, F>(&self, work: F) -> Result<T, UserError>
    where
        F: FnOnce(&Authenticator) -> Result<T, UserError> + Send + 'static,
        T: Send + 'static,
    {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || work(&authenticator))
            .await
            .map_err(|e| UserError::Unknown(format!("Password task failed: {}", e)))?
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn register(
        &self,
        command: RegisterUserCommand,
    ) -> Result<AuthenticatedSession, UserError> {
        let id = UserId::new();
        let password = command.password;
        let password_hash = self
            .with_authenticator(move |a| Ok(a.hash_password(password.expose())?))
            .await?;

        // The first token goes in with the insert so a failed write leaves nothing behind.
        let token = self.authenticator.issue_token(id)?;

        let user = User {
            id,
            name: command.name,
            email: command.email,
            password_hash,
            tokens: vec![token.clone()],
            created_at: Utc::now(),
        };

        let created_user = self.repository.create(user).await?;
        tracing::info!(user_id = %created_user.id, "User registered");

        Ok(AuthenticatedSession {
            user: created_user,
            token,
        })
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, UserError> {
        let email = EmailAddress::new(command.email).map_err(|_| UserError::InvalidCredentials)?;

        let password = command.password;

        let Some(mut user) = self.repository.find_by_email(&email).await? else {
            tracing::debug!(email = %email, "Login for unknown email");
            let rejection = self
                .with_authenticator(move |a| Ok(a.reject_unknown(&password)))
                .await?;
            return Err(rejection.into());
        };

        let stored_hash = user.password_hash.clone();
        let subject = user.id;
        let result = self
            .with_authenticator(move |a| Ok(a.authenticate(&password, &stored_hash, subject)?))
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %user.id, error = %e, "Login rejected");
                e
            })?;

        self.repository
            .append_token(&user.id, &result.access_token)
            .await
            .map_err(|e| match e {
                // Deleted between lookup and append
                UserError::NotFound(_) => UserError::InvalidCredentials,
                other => other,
            })?;

        user.tokens.push(result.access_token.clone());
        tracing::info!(user_id = %user.id, sessions = user.tokens.len(), "User logged in");

        Ok(AuthenticatedSession {
            user,
            token: result.access_token,
        })
    }

    async fn authorize(&self, header: &str) -> Result<User, UserError> {
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(UserError::MissingOrMalformedHeader)?;

        let claims = self.authenticator.validate_token(token).map_err(|e| {
            tracing::warn!(error = %e, "Token verification failed");
            UserError::Unauthorized
        })?;

        let user_id = UserId::from_string(&claims.sub).map_err(|e| {
            tracing::warn!(error = %e, "Token subject is not a user ID");
            UserError::Unauthorized
        })?;

        self.repository
            .find_by_id_and_token(&user_id, token)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Token is not live for user");
                UserError::Unauthorized
            })
    }

    async fn update_user(
        &self,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        if let Some(new_name) = command.name {
            user.name = new_name;
        }

        if let Some(new_email) = command.email {
            user.email = new_email;
        }

        if let Some(new_password) = command.password {
            user.password_hash = self
                .with_authenticator(move |a| Ok(a.hash_password(new_password.expose())?))
                .await?;
        }

        let updated_user = self.repository.update_profile(user).await?;
        tracing::info!(user_id = %updated_user.id, "User updated");

        Ok(updated_user)
    }
}
