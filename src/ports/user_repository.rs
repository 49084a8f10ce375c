//! User repository port.

use crate::domain::billing::User;
use crate::domain::foundation::{DomainError, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Inserts or replaces the user (balance and coupon set).
    async fn save(&self, user: &User) -> Result<(), DomainError>;
}
