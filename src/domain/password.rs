//! Password policy shared by both identity realms

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Password policy configuration for a realm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum password length (default: 8)
    pub min_length: u32,
    /// Require at least one lowercase letter
    pub require_lowercase: bool,
    /// Require at least one uppercase letter
    pub require_uppercase: bool,
    /// Require at least one digit
    pub require_digits: bool,
    /// Require at least one symbol
    pub require_symbols: bool,
    /// Validity of admin-issued temporary passwords, in days
    pub temp_password_validity_days: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digits: true,
            require_symbols: false,
            temp_password_validity_days: 3,
        }
    }
}

impl PasswordPolicy {
    pub fn temp_password_validity(&self) -> Duration {
        Duration::days(i64::from(self.temp_password_validity_days))
    }

    /// Validate a password against this policy
    pub fn validate_password(&self, password: &str) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if password.chars().count() < self.min_length as usize {
            errors.push(format!(
                "Password must be at least {} characters",
                self.min_length
            ));
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }

        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }

        if self.require_digits && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one number".to_string());
        }

        if self.require_symbols
            && !password
                .chars()
                .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
        {
            errors.push("Password must contain at least one symbol".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
