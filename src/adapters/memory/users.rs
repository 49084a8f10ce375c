use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::billing::User;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::UserRepository;

/// In-memory user store.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id.clone(), u)).collect()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn save(&self, user: &User) -> Result<(), DomainError> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }
}
