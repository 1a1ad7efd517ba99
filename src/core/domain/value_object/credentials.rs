use crate::core::domain::error::ValidationError;

/// Operator credentials, reused for the jump host, the target host and sudo.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates validated credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, ValidationError> {
        let username = username.into().trim().to_string();
        let password = password.into();
        validate_username(&username)?;
        validate_password(&password)?;
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password as a string slice.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Validates a login name.
pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::Field {
            field: "username".to_string(),
            message: "Username cannot be empty".to_string(),
        });
    }
    if username.len() > 32 {
        return Err(ValidationError::Format(
            "Username cannot exceed 32 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ValidationError::Format(
            "Username can only contain alphanumeric characters, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// Validates a password.
pub(crate) fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Field {
            field: "password".to_string(),
            message: "Password cannot be empty".to_string(),
        });
    }
    if password.contains('\n') || password.contains('\r') {
        return Err(ValidationError::Format(
            "Password cannot contain line breaks".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let credentials = Credentials::new(" jdoe \n", "s3cret!").unwrap();
        assert_eq!(credentials.username(), "jdoe");
        assert_eq!(credentials.password(), "s3cret!");
    }

    #[test]
    fn test_invalid_credentials() {
        assert!(Credentials::new("", "pw").is_err());
        assert!(Credentials::new("j doe", "pw").is_err());
        assert!(Credentials::new("jdoe", "").is_err());
        assert!(Credentials::new("jdoe", "pw\n").is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials::new("jdoe", "s3cret!").unwrap();
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("jdoe"));
        assert!(!debug.contains("s3cret!"));
    }
}
