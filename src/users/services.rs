use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{CreateUserRequest, UpdateMeRequest};
use crate::error::{ApiResult, FieldErrors};

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MAX_NAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 255;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails compare case-insensitively: stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "This field may not be blank.");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.chars().count() > MAX_NAME_LEN {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
        );
    }
}

/// Normalizes the email in place and checks every registration field.
pub fn validate_registration(req: &mut CreateUserRequest) -> ApiResult<()> {
    req.email = normalize_email(&req.email);
    req.name = req.name.trim().to_string();

    let mut errors = FieldErrors::new();
    if req.email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if req.email.len() > MAX_EMAIL_LEN || !is_valid_email(&req.email) {
        errors.add("email", "Enter a valid email address.");
    }
    check_password(&mut errors, &req.password);
    check_name(&mut errors, &req.name);
    errors.into_result()
}

pub fn validate_profile_update(req: &mut UpdateMeRequest) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if let Some(name) = req.name.as_mut() {
        *name = name.trim().to_string();
        check_name(&mut errors, name);
    }
    if let Some(password) = req.password.as_deref() {
        check_password(&mut errors, password);
    }
    errors.into_result()
}
