//! ABOUTME: Request and response structures for the REST API
//! ABOUTME: Request bodies carry their field rules as validator attributes

use ly_db::User;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";
const GENDERS: &[&str] = &["", "male", "female", "other", "prefer_not_to_say"];

/// Letters, digits and underscores only
pub fn validate_username_format(username: &str) -> Result<(), ValidationError> {
    if !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_format").with_message(
            "Username can only contain letters, numbers, and underscores.".into(),
        ))
    }
}

/// Requires upper and lower case letters, a digit and a special character
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let rules: [(fn(char) -> bool, &'static str); 4] = [
        (
            |c| c.is_ascii_uppercase(),
            "Password must contain at least one uppercase letter.",
        ),
        (
            |c| c.is_ascii_lowercase(),
            "Password must contain at least one lowercase letter.",
        ),
        (
            |c| c.is_ascii_digit(),
            "Password must contain at least one number.",
        ),
        (
            |c| PASSWORD_SPECIALS.contains(c),
            "Password must contain at least one special character.",
        ),
    ];

    for (check, message) in rules {
        if !password.chars().any(check) {
            return Err(ValidationError::new("password_strength").with_message(message.into()));
        }
    }
    Ok(())
}

pub fn validate_birth_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || ly_core::time::is_calendar_date(value) {
        Ok(())
    } else {
        Err(ValidationError::new("date")
            .with_message("Date of birth must be formatted as YYYY-MM-DD".into()))
    }
}

pub fn validate_gender(value: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("gender").with_message("Not a valid choice".into()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(
        length(
            min = 3,
            max = 20,
            message = "Username must be between 3 and 20 characters"
        ),
        custom(function = "validate_username_format")
    )]
    pub username: String,

    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long"),
        custom(function = "validate_password_strength")
    )]
    pub password: String,

    pub password2: String,

    #[validate(length(min = 1, max = 50, message = "First name must be 1 to 50 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1 to 50 characters"))]
    pub last_name: String,

    #[validate(custom(function = "validate_birth_date"))]
    pub date_of_birth: Option<String>,

    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub remember_me: bool,
}

/// Partial profile update; absent fields are left alone
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1 to 50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1 to 50 characters"))]
    pub last_name: Option<String>,

    #[validate(
        length(
            min = 3,
            max = 20,
            message = "Username must be between 3 and 20 characters"
        ),
        custom(function = "validate_username_format")
    )]
    pub username: Option<String>,

    #[validate(custom(function = "validate_birth_date"))]
    pub date_of_birth: Option<String>,

    #[validate(custom(function = "validate_gender"))]
    pub gender: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub new_password2: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CreatePlaylistRequest {
    #[validate(length(min = 1, max = 100, message = "Playlist name must be 1 to 100 characters"))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PlaylistSongRequest {
    #[validate(length(min = 1, message = "playlist_id is required"))]
    pub playlist_id: String,

    #[validate(length(min = 1, message = "song_id is required"))]
    pub song_id: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PlaylistIdRequest {
    #[validate(length(min = 1, message = "playlist_id is required"))]
    pub playlist_id: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RenamePlaylistRequest {
    #[validate(length(min = 1, message = "playlist_id is required"))]
    pub playlist_id: String,

    #[validate(length(min = 1, max = 100, message = "Playlist name must be 1 to 100 characters"))]
    pub new_name: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LogPlayRequest {
    #[validate(length(min = 1, message = "song_id is required"))]
    pub song_id: String,

    #[validate(length(min = 1, message = "song_title is required"))]
    pub song_title: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SongTitleRequest {
    pub song_title: String,
}

fn liked_default() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LikeTitleRequest {
    #[serde(default)]
    pub song_title: String,

    #[serde(default = "liked_default")]
    pub liked: bool,
}

/// Query string for catalog searches
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<u32>,
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub platform: Option<String>,
}

/// Account fields echoed back after registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub success: bool,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub success: bool,
    #[schema(value_type = Object)]
    pub user: User,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Standard error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_registration() -> RegisterRequest {
        RegisterRequest {
            username: "night_owl".to_string(),
            email: "owl@example.com".to_string(),
            password: "Sup3r$ecret".to_string(),
            password2: "Sup3r$ecret".to_string(),
            first_name: "Night".to_string(),
            last_name: "Owl".to_string(),
            date_of_birth: Some("1990-04-12".to_string()),
            gender: Some("other".to_string()),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(valid_registration().validate().is_ok());
    }

    #[test]
    fn test_registration_field_rules() {
        let mut request = valid_registration();
        request.username = "no spaces!".to_string();
        request.email = "not-an-email".to_string();
        request.gender = Some("robot".to_string());
        request.date_of_birth = Some("12/04/1990".to_string());

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("gender"));
        assert!(fields.contains_key("date_of_birth"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_password_strength_messages() {
        let message = |p: &str| {
            validate_password_strength(p)
                .unwrap_err()
                .message
                .unwrap()
                .to_string()
        };
        assert!(message("alllower1!").contains("uppercase"));
        assert!(message("ALLUPPER1!").contains("lowercase"));
        assert!(message("NoDigits!!").contains("number"));
        assert!(message("NoSpecial12").contains("special"));
        assert!(validate_password_strength("Gr8\"Quote").is_ok());
    }

    #[test]
    fn test_empty_optional_fields_are_accepted() {
        assert!(validate_birth_date("").is_ok());
        assert!(validate_gender("").is_ok());
        assert!(validate_gender("prefer_not_to_say").is_ok());
    }

    #[test]
    fn test_like_request_defaults_to_liked() {
        let request: LikeTitleRequest = serde_json::from_str(r#"{"song_title": "Fade"}"#).unwrap();
        assert!(request.liked);
    }
}
