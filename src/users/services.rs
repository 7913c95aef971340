use tracing::{debug, info, warn};

use crate::error::{ApiError, FieldErrors};
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};
use crate::users::password::hash_password;
use crate::users::repo::{RepoError, UserRepository};
use crate::users::repo_types::{NewUser, User, UserChanges};
use crate::users::validation::{taken_msg, validate_create};

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate(field) => {
                warn!(field = field.name(), "unique constraint rejected write");
                ApiError::field(field.name(), taken_msg(field.name()))
            }
            RepoError::Storage(e) => ApiError::Internal(e),
        }
    }
}

/// Parses a path identifier; anything that is not an integer cannot name a record.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::NotFound)
}

pub async fn list_users(repo: &dyn UserRepository) -> Result<Vec<User>, ApiError> {
    let users = repo.list().await?;
    debug!(count = users.len(), "listed users");
    Ok(users)
}

pub async fn create_user(
    repo: &dyn UserRepository,
    req: CreateUserRequest,
) -> Result<User, ApiError> {
    let req = req.normalized();

    let mut taken = FieldErrors::new();
    if let Some(username) = req.username.as_deref() {
        if repo.find_by_username(username).await?.is_some() {
            taken.add("username", taken_msg("username"));
        }
    }
    if let Some(email) = req.email.as_deref() {
        if repo.find_by_email(email).await?.is_some() {
            taken.add("email", taken_msg("email"));
        }
    }

    let valid = validate_create(req, taken).map_err(|errors| {
        warn!(?errors, "create user rejected");
        ApiError::Validation(errors)
    })?;

    let password_hash = hash_password(&valid.password).await?;
    let user = repo
        .create(NewUser {
            first_name: valid.first_name,
            last_name: valid.last_name,
            username: valid.username,
            email: valid.email,
            password_hash,
            phone_no: valid.phone_no,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "user created");
    Ok(user)
}

pub async fn get_user(repo: &dyn UserRepository, id: i64) -> Result<User, ApiError> {
    repo.find(id).await?.ok_or(ApiError::NotFound)
}

/// Applies only the supplied fields. No format or uniqueness rules are
/// re-checked here; the storage constraints still hold. An unknown id is
/// `NotFound` and writes nothing.
pub async fn update_user(
    repo: &dyn UserRepository,
    id: i64,
    req: UpdateUserRequest,
) -> Result<User, ApiError> {
    let req = req.normalized();
    let password_hash = match req.password.as_deref() {
        Some(plain) => Some(hash_password(plain).await?),
        None => None,
    };
    let changes = UserChanges {
        first_name: req.first_name,
        last_name: req.last_name,
        username: req.username,
        email: req.email,
        phone_no: req.phone_no,
        password_hash,
    };

    let user = repo.update(id, changes).await?.ok_or(ApiError::NotFound)?;
    info!(user_id = user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(repo: &dyn UserRepository, id: i64) -> Result<(), ApiError> {
    if !repo.delete(id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id = id, "user deleted");
    Ok(())
}
