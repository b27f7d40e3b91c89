//! Account and login payloads

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Admin => "ADMIN",
        }
    }

    /// Unknown values fall back to the default role
    pub fn parse(value: &str) -> Self {
        match value {
            "ADMIN" => Role::Admin,
            _ => Role::Client,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response of `POST /sessions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

impl Login {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::EmptyField("password"));
        }
        Ok(())
    }
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::EmptyField("password"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_validation() {
        let login = Login { email: "ana@gym.io".into(), password: "secret".into() };
        assert!(login.validate().is_ok());

        let login = Login { email: "ana".into(), password: "secret".into() };
        assert_eq!(login.validate(), Err(ValidationError::InvalidEmail("ana".into())));

        let login = Login { email: "ana@gym.io".into(), password: String::new() };
        assert_eq!(login.validate(), Err(ValidationError::EmptyField("password")));
    }

    #[test]
    fn test_registration_requires_name() {
        let reg = Registration { name: "  ".into(), email: "ana@gym.io".into(), password: "x".into() };
        assert_eq!(reg.validate(), Err(ValidationError::EmptyField("name")));
    }

    #[test]
    fn test_decode_auth_response() {
        let body = r#"{"access_token":"tok","user":{"id":"u1","name":"Ana","email":"ana@gym.io","role":"ADMIN"}}"#;
        let auth: AuthResponse = serde_json::from_str(body).unwrap();
        assert_eq!(auth.access_token, "tok");
        assert_eq!(auth.user.role, Role::Admin);
    }
}
