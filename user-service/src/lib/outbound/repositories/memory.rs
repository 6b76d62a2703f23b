use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

/// Process-local user store.
///
/// Every write holds the lock for its whole check-and-mutate, which gives
/// the same guarantees the Postgres store gets from its unique constraint
/// and `array_append`. Data is lost on restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }
        if users.contains_key(&user.id) {
            return Err(UserError::DatabaseError(format!(
                "duplicate user id {}",
                user.id
            )));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_by_id_and_token(
        &self,
        id: &UserId,
        token: &str,
    ) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .get(id)
            .filter(|u| u.has_token(token))
            .cloned())
    }

    async fn append_token(&self, id: &UserId, token: &str) -> Result<(), UserError> {
        let mut users = self.users.write().await;

        let user = users
            .get_mut(id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        user.tokens.push(token.to_string());

        Ok(())
    }

    async fn update_profile(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }

        let stored = users
            .get_mut(&user.id)
            .ok_or_else(|| UserError::NotFound(user.id.to_string()))?;
        stored.name = user.name;
        stored.email = user.email;
        stored.password_hash = user.password_hash;

        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::domain::user::models::UserName;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            name: UserName::new("Alice".to_string()).unwrap(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            password_hash: "$argon2id$test_hash".to_string(),
            tokens: vec![],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let repository = InMemoryUserRepository::new();

        let first = repository.create(user("a@x.com")).await.unwrap();
        let result = repository.create(user("A@x.com")).await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
        let stored = repository.find_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.email.as_str(), "a@x.com");
    }

    #[tokio::test]
    async fn test_find_by_id_and_token() {
        let repository = InMemoryUserRepository::new();
        let created = repository.create(user("a@x.com")).await.unwrap();

        repository.append_token(&created.id, "t1").await.unwrap();

        assert!(repository
            .find_by_id_and_token(&created.id, "t1")
            .await
            .unwrap()
            .is_some());
        assert!(repository
            .find_by_id_and_token(&created.id, "t2")
            .await
            .unwrap()
            .is_none());
        assert!(repository
            .find_by_id_and_token(&UserId::new(), "t1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_append_token_unknown_user() {
        let repository = InMemoryUserRepository::new();

        let result = repository.append_token(&UserId::new(), "t1").await;
        assert!(matches!(result, Err(UserError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let repository = Arc::new(InMemoryUserRepository::new());
        let created = repository.create(user("a@x.com")).await.unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let repository = Arc::clone(&repository);
                let id = created.id;
                tokio::spawn(async move { repository.append_token(&id, &format!("t{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repository.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.tokens.len(), 32);
    }

    #[tokio::test]
    async fn test_update_profile_keeps_tokens() {
        let repository = InMemoryUserRepository::new();
        let created = repository.create(user("a@x.com")).await.unwrap();
        repository.append_token(&created.id, "t1").await.unwrap();

        let mut changed = created.clone();
        changed.name = UserName::new("Bob".to_string()).unwrap();
        let updated = repository.update_profile(changed).await.unwrap();

        assert_eq!(updated.name.as_str(), "Bob");
        assert_eq!(updated.tokens, vec!["t1".to_string()]);
    }

    #[tokio::test]
    async fn test_update_profile_email_conflict() {
        let repository = InMemoryUserRepository::new();
        repository.create(user("a@x.com")).await.unwrap();
        let other = repository.create(user("b@x.com")).await.unwrap();

        let mut changed = other.clone();
        changed.email = EmailAddress::new("a@x.com".to_string()).unwrap();
        let result = repository.update_profile(changed).await;

        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }
}
