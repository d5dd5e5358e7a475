use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

// Column widths in sql/schema.sql, counted in characters like VARCHAR(n).
pub const MAX_FULL_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 100;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_PHONE_LENGTH: usize = 20;

pub const MSG_FIELDS_REQUIRED: &str = "All fields are required";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 6 characters long";
pub const MSG_INVALID_DATE_OF_BIRTH: &str = "Date of birth must be formatted as YYYY-MM-DD";
pub const MSG_LOGIN_FIELDS_REQUIRED: &str = "Username and password are required";
pub const MSG_SEARCH_REQUIRED: &str = "Search query is required";
pub const MSG_FULL_NAME_TOO_LONG: &str = "Full name must be at most 100 characters";
pub const MSG_EMAIL_TOO_LONG: &str = "Email must be at most 100 characters";
pub const MSG_USERNAME_TOO_LONG: &str = "Username must be at most 50 characters";
pub const MSG_PHONE_TOO_LONG: &str = "Phone must be at most 20 characters";

/// Raw registration input as submitted by a client.
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: SecretString,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_birth: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"***")
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("date_of_birth", &self.date_of_birth)
            .finish()
    }
}

/// Registration that passed presence and length checks.
pub(crate) struct ValidRegistration {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: SecretString,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl Registration {
    pub(crate) fn validate(self) -> Result<ValidRegistration, AuthError> {
        let full_name = self.full_name.trim();
        let email = self.email.trim();
        let username = self.username.trim();

        if full_name.is_empty()
            || email.is_empty()
            || username.is_empty()
            || self.password.expose_secret().is_empty()
        {
            return Err(AuthError::Validation(MSG_FIELDS_REQUIRED));
        }

        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(MSG_PASSWORD_TOO_SHORT));
        }

        let phone = non_blank(self.phone);
        let limits = [
            (full_name, MAX_FULL_NAME_LENGTH, MSG_FULL_NAME_TOO_LONG),
            (email, MAX_EMAIL_LENGTH, MSG_EMAIL_TOO_LONG),
            (username, MAX_USERNAME_LENGTH, MSG_USERNAME_TOO_LONG),
            (phone.as_deref().unwrap_or_default(), MAX_PHONE_LENGTH, MSG_PHONE_TOO_LONG),
        ];
        if let Some((_, _, message)) = limits
            .into_iter()
            .find(|(value, max, _)| value.chars().count() > *max)
        {
            return Err(AuthError::Validation(message));
        }

        let date_of_birth = match non_blank(self.date_of_birth) {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|_| AuthError::Validation(MSG_INVALID_DATE_OF_BIRTH))?,
            ),
            None => None,
        };

        Ok(ValidRegistration {
            full_name: full_name.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password: self.password,
            phone,
            address: non_blank(self.address),
            date_of_birth,
        })
    }
}

/// Public identity returned after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProfile {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(password: &str) -> Registration {
        Registration {
            full_name: " Ann Lee ".to_string(),
            email: "ann@x.com".to_string(),
            username: "annl".to_string(),
            password: SecretString::from(password.to_string()),
            phone: Some("   ".to_string()),
            address: Some(" 1 Main St ".to_string()),
            date_of_birth: None,
        }
    }

    #[test]
    fn trims_identity_and_drops_blank_optionals() {
        let valid = registration("secret1").validate().unwrap();
        assert_eq!(valid.full_name, "Ann Lee");
        assert_eq!(valid.phone, None);
        assert_eq!(valid.address.as_deref(), Some("1 Main St"));
        assert_eq!(valid.date_of_birth, None);
    }

    #[test]
    fn missing_field_is_rejected_before_length() {
        let mut input = registration("");
        let err = registration("").validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_FIELDS_REQUIRED);

        input.password = SecretString::from("secret1".to_string());
        input.username = "  ".to_string();
        let err = input.validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_FIELDS_REQUIRED);
    }

    #[test]
    fn password_length_counts_characters() {
        let err = registration("12345").validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_PASSWORD_TOO_SHORT);

        // six characters, more than six bytes
        assert!(registration("ñññııı").validate().is_ok());
    }

    #[test]
    fn date_of_birth_must_be_iso() {
        let mut input = registration("secret1");
        input.date_of_birth = Some("1990-04-12".to_string());
        let valid = input.validate().unwrap();
        assert_eq!(valid.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12));

        let mut input = registration("secret1");
        input.date_of_birth = Some("12/04/1990".to_string());
        let err = input.validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_INVALID_DATE_OF_BIRTH);

        let mut input = registration("secret1");
        input.date_of_birth = Some(String::new());
        assert_eq!(input.validate().unwrap().date_of_birth, None);
    }

    #[test]
    fn fields_wider_than_their_columns_are_rejected() {
        let mut input = registration("secret1");
        input.username = "u".repeat(MAX_USERNAME_LENGTH + 10);
        let err = input.validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_USERNAME_TOO_LONG);

        let mut input = registration("secret1");
        input.phone = Some("5".repeat(30));
        let err = input.validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_PHONE_TOO_LONG);

        let mut input = registration("secret1");
        input.email = format!("{}@x.com", "e".repeat(MAX_EMAIL_LENGTH));
        let err = input.validate().err().unwrap();
        assert_eq!(err.to_string(), MSG_EMAIL_TOO_LONG);

        let mut input = registration("secret1");
        input.full_name = "ñ".repeat(MAX_FULL_NAME_LENGTH);
        input.username = "u".repeat(MAX_USERNAME_LENGTH);
        input.phone = Some("5".repeat(MAX_PHONE_LENGTH));
        assert!(input.validate().is_ok(), "limits are inclusive and count characters");
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", registration("secret1"));
        assert!(!rendered.contains("secret1"));
    }
}
