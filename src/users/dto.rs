use serde::{Deserialize, Deserializer, Serialize};

/// Request body for `POST /users`. Every field is optional at the JSON
/// level so that missing values surface as field errors, not as a
/// deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone_no: Option<String>,
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Outer `None`: key absent. `Some(None)`: explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub phone_no: Option<Option<String>>,
}

fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_from_absent_phone() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"first_name":"Jane"}"#).unwrap();
        assert!(absent.phone_no.is_none());
        assert_eq!(absent.first_name.as_deref(), Some("Jane"));

        let null: UpdateUserRequest = serde_json::from_str(r#"{"phone_no":null}"#).unwrap();
        assert_eq!(null.phone_no, Some(None));

        let set: UpdateUserRequest = serde_json::from_str(r#"{"phone_no":"555"}"#).unwrap();
        assert_eq!(set.phone_no, Some(Some("555".to_string())));
    }

    #[test]
    fn update_ignores_immutable_keys() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"id":7,"created_at":"2020-01-01T00:00:00Z","last_name":"Roe"}"#)
                .unwrap();
        assert_eq!(req.last_name.as_deref(), Some("Roe"));
    }

    #[test]
    fn create_accepts_missing_fields() {
        let req: CreateUserRequest = serde_json::from_str("{}").unwrap();
        assert!(req.username.is_none());
        assert!(req.password.is_none());
    }
}
