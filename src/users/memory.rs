use std::collections::BTreeMap;

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::repo::{RepoError, UniqueField, UserRepository};
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    users: BTreeMap<i64, User>,
}

impl Inner {
    /// First unique column `username`/`email` would collide on, ignoring `skip`.
    fn conflict(&self, username: &str, email: &str, skip: Option<i64>) -> Option<UniqueField> {
        let others = self.users.values().filter(|u| Some(u.id) != skip);
        for u in others {
            if u.username == username {
                return Some(UniqueField::Username);
            }
            if u.email == email {
                return Some(UniqueField::Email);
            }
        }
        None
    }
}

/// Process-local user storage. Ids are never reused, even after delete.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Inner>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().cloned().collect())
    }

    async fn find(&self, id: i64) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let mut inner = self.inner.write().await;
        if let Some(field) = inner.conflict(&user.username, &user.email, None) {
            return Err(RepoError::Duplicate(field));
        }

        inner.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let created = User {
            id: inner.last_id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            phone_no: user.phone_no,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.users.get(&id) else {
            return Ok(None);
        };

        let mut next = current.clone();
        changes.apply(&mut next);
        if let Some(field) = inner.conflict(&next.username, &next.email, Some(id)) {
            return Err(RepoError::Duplicate(field));
        }

        next.updated_at = OffsetDateTime::now_utc();
        inner.users.insert(id, next.clone());
        Ok(Some(next))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.remove(&id).is_some())
    }
}
