use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, first_name, last_name, username, email, password, phone_no, created_at, updated_at";

/// Column guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn name(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{} already taken", .0.name())]
    Duplicate(UniqueField),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Storage for user records. Implementations enforce uniqueness of
/// `username` and `email` at write time.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All records ordered by id.
    async fn list(&self) -> Result<Vec<User>, RepoError>;
    async fn find(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;
    /// Returns `None` when no record has this id.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError>;
    /// Returns `false` when no record has this id.
    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps a unique-constraint violation to the column it protects.
fn classify(e: sqlx::Error, what: &'static str) -> RepoError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(c) if c.contains("username") => {
                    return RepoError::Duplicate(UniqueField::Username)
                }
                Some(c) if c.contains("email") => return RepoError::Duplicate(UniqueField::Email),
                _ => {}
            }
        }
    }
    RepoError::Storage(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, RepoError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (first_name, last_name, username, email, password, phone_no)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_no)
        .fetch_one(&self.db)
        .await
        .map_err(|e| classify(e, "insert user"))?;
        Ok(created)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError> {
        let (set_phone, phone_no) = match changes.phone_no {
            Some(v) => (true, v),
            None => (false, None),
        };
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   username   = COALESCE($4, username),
                   email      = COALESCE($5, email),
                   phone_no   = CASE WHEN $6 THEN $7 ELSE phone_no END,
                   password   = COALESCE($8, password),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.username)
        .bind(changes.email)
        .bind(set_phone)
        .bind(phone_no)
        .bind(changes.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| classify(e, "update user"))?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(done.rows_affected() > 0)
    }
}

/// Needs a reachable Postgres: `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod pg_tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            first_name: "John".into(),
            last_name: "Doe".into(),
            username: username.into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            phone_no: Some("555-0100".into()),
        }
    }

    #[sqlx::test]
    #[ignore]
    async fn unique_violations_name_the_column(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create(new_user("dup", "one@example.com")).await.unwrap();

        let err = repo.create(new_user("dup", "two@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Username)));

        let err = repo.create(new_user("other", "one@example.com")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Email)));

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore]
    async fn update_clears_or_keeps_phone(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        let user = repo.create(new_user("phone", "phone@example.com")).await.unwrap();

        let kept = UserChanges {
            first_name: Some("Jane".into()),
            ..Default::default()
        };
        let updated = repo.update(user.id, kept).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Jane");
        assert_eq!(updated.phone_no.as_deref(), Some("555-0100"));
        assert_eq!(updated.password_hash, user.password_hash);
        assert_eq!(updated.created_at, user.created_at);

        let cleared = UserChanges {
            phone_no: Some(None),
            ..Default::default()
        };
        let updated = repo.update(user.id, cleared).await.unwrap().unwrap();
        assert!(updated.phone_no.is_none());
        assert_eq!(updated.first_name, "Jane");
    }

    #[sqlx::test]
    #[ignore]
    async fn update_into_taken_email_is_duplicate(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        repo.create(new_user("first", "first@example.com")).await.unwrap();
        let second = repo.create(new_user("second", "second@example.com")).await.unwrap();

        let changes = UserChanges {
            email: Some("first@example.com".into()),
            ..Default::default()
        };
        let err = repo.update(second.id, changes).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(UniqueField::Email)));
    }

    #[sqlx::test]
    #[ignore]
    async fn missing_ids_and_ordering(pool: PgPool) {
        let repo = PgUserRepository::new(pool);
        assert!(repo.find(999_999).await.unwrap().is_none());
        assert!(repo.update(999_999, UserChanges::default()).await.unwrap().is_none());
        assert!(!repo.delete(999_999).await.unwrap());

        let a = repo.create(new_user("a", "a@example.com")).await.unwrap();
        let b = repo.create(new_user("b", "b@example.com")).await.unwrap();
        let ids: Vec<i64> = repo.list().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        assert!(repo.delete(a.id).await.unwrap());
        assert!(repo.find(a.id).await.unwrap().is_none());
        assert_eq!(
            repo.find_by_username("b").await.unwrap().map(|u| u.id),
            Some(b.id)
        );
        assert_eq!(
            repo.find_by_email("b@example.com").await.unwrap().map(|u| u.id),
            Some(b.id)
        );
    }
}
