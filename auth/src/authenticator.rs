use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::TokenIssuer;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Authentication coordinator combining password verification and token issuance.
///
/// Holds the process-wide password work factor and signing secret, so
/// services receive it once at construction instead of reading global state.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_issuer: TokenIssuer,
    decoy_hash: String,
}

const DECOY_PASSWORD: &str = "decoy-password-never-assigned";

/// Result of successful authentication.
#[derive(Debug)]
pub struct AuthenticationResult {
    /// Signed bearer token
    pub access_token: String,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// Create a new authenticator with the default password work factor.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for token signing
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self::with_password_hasher(jwt_secret, PasswordHasher::new())
    }

    /// Create a new authenticator with a configured password hasher.
    pub fn with_password_hasher(jwt_secret: &[u8], password_hasher: PasswordHasher) -> Self {
        // Same work factor as real hashes, so rejecting an unknown account costs a full verify
        let decoy_hash = password_hasher.hash(DECOY_PASSWORD).unwrap_or_default();

        Self {
            password_hasher,
            token_issuer: TokenIssuer::new(jwt_secret),
            decoy_hash,
        }
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify credentials and issue a token for `subject`.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `subject` - Identifier the issued token is bound to
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash could not be parsed
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        subject: impl ToString,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        if !self.password_hasher.verify(password, stored_hash)? {
            return Err(AuthenticationError::InvalidCredentials);
        }

        let access_token = self.token_issuer.issue(subject)?;

        Ok(AuthenticationResult { access_token })
    }

    /// Reject a login for an account that does not exist.
    ///
    /// Runs one verification against a decoy hash so the rejection takes as
    /// long as a wrong password for a real account.
    pub fn reject_unknown(&self, password: &str) -> AuthenticationError {
        let _ = self.password_hasher.verify(password, &self.decoy_hash);
        AuthenticationError::InvalidCredentials
    }

    /// Issue a token without password verification.
    ///
    /// Used right after registration, where the caller has just chosen the password.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_token(&self, subject: impl ToString) -> Result<String, JwtError> {
        self.token_issuer.issue(subject)
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// # Errors
    /// * `InvalidSignature` - Token was signed with another secret
    /// * `Malformed` - Token cannot be decoded
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.token_issuer.verify(token)
    }
}
