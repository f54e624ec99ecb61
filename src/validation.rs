// Form schemas. Each check runs in field order and stops at the first failure.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::models::{
    ContactPayload, LeadPayload, LeadType, NewContact, NewLead, NewsletterPayload,
};

lazy_static! {
    // local part may not start with a dot or hold ".."; checked separately below
    static ref EMAIL_RE: Regex =
        Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
            .unwrap();
}

const NAME_MAX: usize = 100;
const SUBJECT_MAX: usize = 200;
const MESSAGE_MAX: usize = 500;

const REQUIRED: &str = "Required";
const NULL_NOT_ALLOWED: &str = "Expected string, received null";

// message is shown to the caller verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_RE.is_match(email)
}

fn email(value: Option<String>) -> Result<String, ValidationError> {
    match value {
        None => Err(ValidationError::new("email", REQUIRED)),
        Some(email) if is_valid_email(&email) => Ok(email),
        Some(_) => Err(ValidationError::new("email", "Invalid email format")),
    }
}

// 1..=max characters
fn bounded(
    field: &'static str,
    value: Option<String>,
    max: usize,
    required: &'static str,
    too_long: &'static str,
) -> Result<String, ValidationError> {
    let Some(value) = value else {
        return Err(ValidationError::new(field, REQUIRED));
    };
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, required));
    }
    if len > max {
        return Err(ValidationError::new(field, too_long));
    }
    Ok(value)
}

// may be left out, but not sent as null
fn optional(
    field: &'static str,
    value: Option<Option<String>>,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(None) => Err(ValidationError::new(field, NULL_NOT_ALLOWED)),
        Some(Some(value)) => Ok(Some(value)),
    }
}

pub fn validate_contact(payload: ContactPayload) -> Result<NewContact, ValidationError> {
    let name = bounded("name", payload.name, NAME_MAX, "Name is required", "Name too long")?;
    let email = email(payload.email)?;
    let subject = bounded(
        "subject",
        payload.subject,
        SUBJECT_MAX,
        "Subject is required",
        "Subject too long",
    )?;
    let message = bounded(
        "message",
        payload.message,
        MESSAGE_MAX,
        "Message is required",
        "Message too long",
    )?;

    Ok(NewContact {
        name,
        email,
        subject,
        message,
    })
}

pub fn validate_lead(payload: LeadPayload) -> Result<NewLead, ValidationError> {
    let name = bounded("name", payload.name, NAME_MAX, "Name is required", "Name too long")?;
    let email = email(payload.email)?;
    let company = bounded(
        "company",
        payload.company,
        NAME_MAX,
        "Company is required",
        "Company name too long",
    )?;
    let role = bounded("role", payload.role, NAME_MAX, "Role is required", "Role too long")?;
    let phone = optional("phone", payload.phone)?;
    let message = optional("message", payload.message)?;

    if let Some(message) = &message {
        if message.chars().count() > MESSAGE_MAX {
            return Err(ValidationError::new("message", "Message too long"));
        }
    }

    let lead_type = match payload.lead_type {
        None => return Err(ValidationError::new("leadType", REQUIRED)),
        Some(raw) => raw
            .parse::<LeadType>()
            .map_err(|_| ValidationError::new("leadType", "Invalid lead type"))?,
    };

    Ok(NewLead {
        name,
        email,
        company,
        role,
        phone,
        message,
        lead_type,
    })
}

pub fn validate_newsletter(payload: NewsletterPayload) -> Result<String, ValidationError> {
    email(payload.email)
}
