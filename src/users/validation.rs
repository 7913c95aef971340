use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldErrors;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};

pub const NAME_MAX: usize = 255;
pub const PHONE_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}

pub fn required_msg(field: &str) -> String {
    format!("The {} field is required.", label(field))
}

pub fn max_msg(field: &str, max: usize) -> String {
    format!("The {} may not be greater than {} characters.", label(field), max)
}

pub fn taken_msg(field: &str) -> String {
    format!("The {} has already been taken.", label(field))
}

/// Trims surrounding whitespace; blank becomes `None`.
fn clean(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Passwords are never trimmed, only emptiness is checked.
fn clean_password(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

impl CreateUserRequest {
    pub fn normalized(self) -> Self {
        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            username: clean(self.username),
            email: clean(self.email),
            password: clean_password(self.password),
            phone_no: clean(self.phone_no),
        }
    }
}

impl UpdateUserRequest {
    /// Same cleaning as create; a blank `phone_no` clears it.
    pub fn normalized(self) -> Self {
        Self {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            username: clean(self.username),
            email: clean(self.email),
            password: clean_password(self.password),
            phone_no: self.phone_no.map(clean),
        }
    }
}

/// A create payload that passed every rule. The password is still plaintext.
#[derive(Debug)]
pub struct ValidCreate {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone_no: Option<String>,
}

fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, required_msg(field));
            None
        }
        Some(v) if v.chars().count() > max => {
            errors.add(field, max_msg(field, max));
            None
        }
        Some(v) => Some(v),
    }
}

/// Checks a normalized create payload. `taken` carries uniqueness failures
/// found in storage; they are reported only for fields whose format is valid.
pub fn validate_create(
    req: CreateUserRequest,
    taken: FieldErrors,
) -> Result<ValidCreate, FieldErrors> {
    let mut errors = FieldErrors::new();

    let first_name = required_text(&mut errors, "first_name", req.first_name, NAME_MAX);
    let last_name = required_text(&mut errors, "last_name", req.last_name, NAME_MAX);
    let username = required_text(&mut errors, "username", req.username, NAME_MAX);

    let email = match req.email {
        None => {
            errors.add("email", required_msg("email"));
            None
        }
        Some(v) if !is_valid_email(&v) => {
            errors.add("email", "The email must be a valid email address.");
            None
        }
        Some(v) if v.chars().count() > NAME_MAX => {
            errors.add("email", max_msg("email", NAME_MAX));
            None
        }
        Some(v) => Some(v),
    };

    let password = match req.password {
        None => {
            errors.add("password", required_msg("password"));
            None
        }
        Some(v) if v.chars().count() < PASSWORD_MIN => {
            errors.add(
                "password",
                format!("The password must be at least {} characters.", PASSWORD_MIN),
            );
            None
        }
        Some(v) => Some(v),
    };

    let phone_no = match req.phone_no {
        Some(v) if v.chars().count() > PHONE_MAX => {
            errors.add("phone_no", max_msg("phone_no", PHONE_MAX));
            None
        }
        other => other,
    };

    for field in ["username", "email"] {
        if errors.has(field) {
            continue;
        }
        if let Some(messages) = taken.get(field) {
            for m in messages {
                errors.add(field, m.clone());
            }
        }
    }

    match (first_name, last_name, username, email, password) {
        (Some(first_name), Some(last_name), Some(username), Some(email), Some(password))
            if errors.is_empty() =>
        {
            Ok(ValidCreate {
                first_name,
                last_name,
                username,
                email,
                password,
                phone_no,
            })
        }
        _ => Err(errors),
    }
}
