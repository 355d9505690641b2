//! Client-side form validation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Forms run these checks before touching the session store or the expense
//! API, so a validation failure never costs a network round trip. The first
//! failing rule wins, in the order the fields appear on screen.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::sync::LazyLock;

use regex::Regex;

/// Largest amount accepted by the amount fields (2^53 - 1, exclusive).
pub const MAX_AMOUNT: i64 = 9_007_199_254_740_991;
const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Form field a validation message is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Terms,
    Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::new(Field::Password, "Password is required"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accepted_terms: bool,
}

impl SignUpForm {
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new(Field::Name, "Name is required"));
        }
        check_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::new(Field::Password, "Password is required"));
        }
        if !is_strong_password(&self.password) {
            return Err(ValidationError::new(
                Field::Password,
                "Password must be at least 8 characters with letters and numbers",
            ));
        }
        if self.confirm_password.is_empty() {
            return Err(ValidationError::new(Field::ConfirmPassword, "Please confirm your password"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::new(Field::ConfirmPassword, "Passwords do not match"));
        }
        if !self.accepted_terms {
            return Err(ValidationError::new(Field::Terms, "You must accept the terms and conditions"));
        }
        Ok(())
    }
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::new(Field::Email, "Email is required"));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::new(Field::Email, "Invalid email format"));
    }
    Ok(())
}

/// At least eight ASCII letters or digits, with at least one of each and
/// nothing else.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Parse a typed amount, tolerating digit grouping (`"1,200"`, `"1 200"`).
///
/// # Errors
///
/// Rejects empty, non-integer and negative input, and anything at or above
/// [`MAX_AMOUNT`].
pub fn parse_amount(raw: &str) -> Result<i64, ValidationError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
    let invalid = || ValidationError::new(Field::Amount, "Enter a valid amount");
    let amount = match cleaned.parse::<i64>() {
        Ok(amount) => amount,
        Err(e) if matches!(e.kind(), std::num::IntErrorKind::PosOverflow) => {
            return Err(ValidationError::new(Field::Amount, "Amount is too large"));
        }
        Err(_) => return Err(invalid()),
    };
    if amount < 0 {
        return Err(invalid());
    }
    if amount >= MAX_AMOUNT {
        return Err(ValidationError::new(Field::Amount, "Amount is too large"));
    }
    Ok(amount)
}
