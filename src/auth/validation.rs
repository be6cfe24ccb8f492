//! Per-endpoint input rules.
//!
//! Each endpoint owns an ordered list of [`FieldRules`]. Every rule of every
//! field is evaluated and all violations are reported together; only a body
//! with no violations is converted into its typed request.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AuthError, AuthResult, FieldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    NotEmpty,
    IsString,
    /// Inclusive bounds on the number of characters.
    Length { min: usize, max: Option<usize> },
    Email,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

const NAME: &[Rule] = &[
    Rule::NotEmpty,
    Rule::IsString,
    Rule::Length { min: 4, max: Some(12) },
];
const USERNAME: &[Rule] = &[
    Rule::NotEmpty,
    Rule::IsString,
    Rule::Length { min: 4, max: Some(8) },
];
const EMAIL: &[Rule] = &[Rule::NotEmpty, Rule::Email];
const PASSWORD: &[Rule] = &[
    Rule::NotEmpty,
    Rule::IsString,
    Rule::Length { min: 8, max: None },
];
const ID: &[Rule] = &[Rule::NotEmpty];

pub const REGISTER: &[FieldRules] = &[
    FieldRules { field: "firstName", rules: NAME },
    FieldRules { field: "lastName", rules: NAME },
    FieldRules { field: "username", rules: USERNAME },
    FieldRules { field: "email", rules: EMAIL },
    FieldRules { field: "password", rules: PASSWORD },
];

pub const LOGIN: &[FieldRules] = &[
    FieldRules {
        field: "username",
        rules: &[Rule::NotEmpty, Rule::Length { min: 4, max: Some(8) }],
    },
    FieldRules {
        field: "password",
        rules: &[Rule::NotEmpty, Rule::Length { min: 8, max: None }],
    },
];

pub const BY_ID: &[FieldRules] = &[FieldRules { field: "id", rules: ID }];

pub const UPDATE: &[FieldRules] = &[
    FieldRules { field: "id", rules: ID },
    FieldRules { field: "firstName", rules: NAME },
    FieldRules { field: "lastName", rules: NAME },
    FieldRules { field: "username", rules: USERNAME },
    FieldRules { field: "email", rules: EMAIL },
    FieldRules { field: "password", rules: PASSWORD },
];

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)*\.[A-Za-z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Text form of a field, as the length and email rules see it.
fn as_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn check(rule: Rule, value: Option<&Value>, text: &str) -> Option<String> {
    match rule {
        Rule::NotEmpty if text.is_empty() => Some("must not be empty".into()),
        Rule::IsString if !matches!(value, Some(Value::String(_))) => {
            Some("must be a string".into())
        }
        Rule::Length { min, max } => {
            let len = text.chars().count();
            match max {
                Some(max) if len < min || len > max => {
                    Some(format!("must be between {min} and {max} characters"))
                }
                None if len < min => Some(format!("must be at least {min} characters")),
                _ => None,
            }
        }
        Rule::Email if !is_valid_email(text) => Some("must be a valid email address".into()),
        _ => None,
    }
}

/// Collects every violation of `ruleset` in `body`, in ruleset order.
pub fn validate(body: &Value, ruleset: &[FieldRules]) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in ruleset {
        let value = body.get(field.field);
        let text = as_text(value);
        for rule in field.rules {
            if let Some(message) = check(*rule, value, &text) {
                errors.push(FieldError::new(field.field, message));
            }
        }
    }
    errors
}

/// Validates `body` and only then converts it into `T`.
pub fn parse<T: DeserializeOwned>(body: Value, ruleset: &[FieldRules]) -> AuthResult<T> {
    let errors = validate(&body, ruleset);
    if !errors.is_empty() {
        return Err(AuthError::ValidationFailed(errors));
    }
    serde_json::from_value(body)
        .map_err(|e| AuthError::ValidationFailed(vec![FieldError::new("body", e.to_string())]))
}
