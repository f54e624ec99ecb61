use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Why the lead came in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadType {
    Demo,
    Consultation,
    Guide,
    Newsletter,
}

impl LeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadType::Demo => "DEMO",
            LeadType::Consultation => "CONSULTATION",
            LeadType::Guide => "GUIDE",
            LeadType::Newsletter => "NEWSLETTER",
        }
    }
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown lead type: {0}")]
pub struct UnknownLeadType(pub String);

impl FromStr for LeadType {
    type Err = UnknownLeadType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEMO" => Ok(LeadType::Demo),
            "CONSULTATION" => Ok(LeadType::Consultation),
            "GUIDE" => Ok(LeadType::Guide),
            "NEWSLETTER" => Ok(LeadType::Newsletter),
            other => Err(UnknownLeadType(other.to_string())),
        }
    }
}

// Incoming request bodies. Fields stay optional so a missing value
// surfaces as a validation message rather than a parse failure.

// Outer None when the key is absent, Some(None) for an explicit null
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeadPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    #[serde(deserialize_with = "explicit_null")]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "explicit_null")]
    pub message: Option<Option<String>>,
    pub lead_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewsletterPayload {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GuideQuery {
    pub email: Option<String>,
}

// Validated input, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub lead_type: LeadType,
}

impl NewLead {
    // Placeholder lead recorded for a bare newsletter signup
    pub fn newsletter(email: String) -> Self {
        Self {
            name: "Newsletter Subscriber".to_string(),
            email,
            company: "Unknown".to_string(),
            role: "Unknown".to_string(),
            phone: None,
            message: None,
            lead_type: LeadType::Newsletter,
        }
    }
}

// Stored rows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub lead_type: LeadType,
    pub created_at: DateTime<Utc>,
}

// What a newsletter signup did
#[derive(Debug, Clone)]
pub enum NewsletterSignup {
    Created(Lead),
    AlreadySubscribed,
}

// Response `data` payloads
#[derive(Debug, Serialize)]
pub struct RecordId {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Subscription {
    Created {
        id: String,
    },
    Existing {
        #[serde(rename = "alreadySubscribed")]
        already_subscribed: bool,
    },
}
