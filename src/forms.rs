// Request bodies and their validation rules.
//
// Each form validates into either a cleaned value or a `ValidationErrors`
// map of field name to messages, which handlers return as a 422.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

use crate::models::Level;

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 120;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const FEEDBACK_NAME_MAX_LEN: usize = 100;
pub const FEEDBACK_MESSAGE_MAX_LEN: usize = 500;
pub const WORD_MAX_LEN: usize = 100;
pub const LEVEL_MAX_ATTEMPTS: i32 = 100;
pub const LEVEL_MAX_POINTS_PER_ATTEMPT: i32 = 1_000;
pub const LEVEL_MAX_SCORE_MULTIPLIER: f64 = 10.0;

/// Field name -> messages
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[cfg(test)]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        errors.add(
            "username",
            format!("Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"),
        );
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        errors.add(
            "username",
            "Username may only contain letters, numbers, '.', '_' and '-'",
        );
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
        return;
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        errors.add("email", format!("Email must be at most {EMAIL_MAX_LEN} characters"));
    }
    if !is_valid_email(email) {
        errors.add("email", "Invalid email address");
    }
}

/// Structural email check: `local@domain.tld`, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, self.username.trim());
        check_email(&mut errors, self.email.trim());
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(
                "password",
                format!("Password must be at least {PASSWORD_MIN_LEN} characters"),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords must match");
        }
        errors.into_result()
    }

    pub fn username(&self) -> &str {
        self.username.trim()
    }

    /// Emails are compared case-insensitively
    pub fn email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Issue a long-lived token
    #[serde(default)]
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }

    pub fn email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() > FEEDBACK_NAME_MAX_LEN {
            errors.add(
                "name",
                format!("Name must be at most {FEEDBACK_NAME_MAX_LEN} characters"),
            );
        }
        check_email(&mut errors, self.email.trim());
        let message = self.message.trim();
        if message.is_empty() {
            errors.add("message", "Message is required");
        } else if message.chars().count() > FEEDBACK_MESSAGE_MAX_LEN {
            errors.add(
                "message",
                format!("Message must be at most {FEEDBACK_MESSAGE_MAX_LEN} characters"),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StartGameForm {
    #[serde(default)]
    pub level: Option<String>,
}

impl StartGameForm {
    /// Missing level means easy
    pub fn level(&self) -> Result<Level, ValidationErrors> {
        match self.level.as_deref() {
            None => Ok(Level::Easy),
            Some(raw) => raw
                .parse()
                .map_err(|_| ValidationErrors::single("level", "Invalid level selected")),
        }
    }
}

/// Guess submission. Accepts a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
pub struct GuessForm {
    pub guess: Value,
}

impl GuessForm {
    pub fn value(&self) -> Result<i32, ValidationErrors> {
        let parsed = match &self.guess {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| ValidationErrors::single("guess", "Please enter a valid number"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
}

impl EditUserForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, self.username.trim());
        check_email(&mut errors, self.email.trim());
        errors.into_result()
    }

    pub fn username(&self) -> &str {
        self.username.trim()
    }

    pub fn email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelSettingsForm {
    pub range_low: i32,
    pub range_high: i32,
    pub max_attempts: i32,
    pub points_per_attempt: i32,
    pub score_multiplier: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl LevelSettingsForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.range_low < 1 {
            errors.add("range_low", "Minimum must be at least 1");
        }
        if self.range_high < 2 {
            errors.add("range_high", "Maximum must be at least 2");
        }
        if self.range_low >= self.range_high {
            errors.add("range_high", "Minimum must be less than maximum");
        }
        if !(1..=LEVEL_MAX_ATTEMPTS).contains(&self.max_attempts) {
            errors.add(
                "max_attempts",
                format!("Attempts must be between 1 and {LEVEL_MAX_ATTEMPTS}"),
            );
        }
        if !(1..=LEVEL_MAX_POINTS_PER_ATTEMPT).contains(&self.points_per_attempt) {
            errors.add(
                "points_per_attempt",
                format!("Points per attempt must be between 1 and {LEVEL_MAX_POINTS_PER_ATTEMPT}"),
            );
        }
        if !(1.0..=LEVEL_MAX_SCORE_MULTIPLIER).contains(&self.score_multiplier) {
            errors.add(
                "score_multiplier",
                format!("Score multiplier must be between 1 and {LEVEL_MAX_SCORE_MULTIPLIER}"),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordForm {
    pub text: String,
    pub difficulty: String,
    #[serde(default)]
    pub max_attempts: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// A validated word ready for storage
#[derive(Debug, Clone, PartialEq)]
pub struct CleanWord {
    pub text: String,
    pub difficulty: Level,
    pub max_attempts: Option<i32>,
    pub is_active: Option<bool>,
}

impl WordForm {
    pub fn validate(&self) -> Result<CleanWord, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let text = self.text.trim().to_lowercase();
        if text.is_empty() {
            errors.add("text", "Word is required");
        } else if text.chars().count() > WORD_MAX_LEN {
            errors.add("text", format!("Word must be at most {WORD_MAX_LEN} characters"));
        }
        let difficulty = parse_difficulty(&mut errors, &self.difficulty);
        if matches!(self.max_attempts, Some(n) if n < 1) {
            errors.add("max_attempts", "Attempts must be positive");
        }

        match difficulty {
            Some(difficulty) if errors.is_empty() => Ok(CleanWord {
                text,
                difficulty,
                max_attempts: self.max_attempts,
                is_active: self.is_active,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordImportForm {
    /// Newline-separated words
    pub words: String,
    pub difficulty: String,
}

impl WordImportForm {
    pub fn difficulty(&self) -> Result<Level, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match parse_difficulty(&mut errors, &self.difficulty) {
            Some(level) => Ok(level),
            None => Err(errors),
        }
    }
}

fn parse_difficulty(errors: &mut ValidationErrors, raw: &str) -> Option<Level> {
    if raw.trim().is_empty() {
        errors.add("difficulty", "Difficulty is required");
        return None;
    }
    match raw.parse::<Level>() {
        Ok(level) => Some(level),
        Err(_) => {
            errors.add("difficulty", "Invalid difficulty level");
            None
        }
    }
}
