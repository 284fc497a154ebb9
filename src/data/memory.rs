use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{StoreError, User, UserStore};

/// In-process [`UserStore`] with the same upsert semantics as PostgreSQL.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, NaiveDate>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(user.username.clone(), user.date_of_birth);
        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let users = self.users.read().await;
        let date_of_birth = users.get(username).copied().ok_or(StoreError::NotFound)?;
        Ok(User { username: username.to_owned(), date_of_birth })
    }
}
