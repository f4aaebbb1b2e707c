//! Inbound contact leads.

use chrono::{DateTime, Utc};
use common::ContactId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::validation::FieldErrors;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("Unknown contact status: {0}")]
    UnknownStatus(String),
}

/// Follow-up state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    InProgress,
    Responded,
    Closed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::InProgress => "in_progress",
            ContactStatus::Responded => "responded",
            ContactStatus::Closed => "closed",
        }
    }

    /// Leads nobody has looked at yet.
    pub fn is_unread(&self) -> bool {
        matches!(self, ContactStatus::New)
    }

    /// Leads still waiting on a response.
    pub fn is_pending(&self) -> bool {
        matches!(self, ContactStatus::New | ContactStatus::InProgress)
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ContactStatus::New),
            "in_progress" => Ok(ContactStatus::InProgress),
            "responded" => Ok(ContactStatus::Responded),
            "closed" => Ok(ContactStatus::Closed),
            other => Err(ContactError::UnknownStatus(other.to_string())),
        }
    }
}

/// A stored contact lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLead {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub source: Option<String>,
    pub role: Option<String>,
    pub requirement: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

/// Public contact form submission.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 10, max = 20, message = "must be between 10 and 20 characters"))]
    pub phone: String,
    #[validate(email(message = "is invalid"))]
    pub email: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub requirement: Option<String>,
    #[validate(length(min = 10, max = 2000, message = "must be between 10 and 2000 characters"))]
    pub message: String,
}

impl ContactForm {
    /// Validates the form and builds a new lead.
    pub fn into_lead(self, now: DateTime<Utc>) -> Result<ContactLead, FieldErrors> {
        self.validate()?;
        Ok(ContactLead {
            id: ContactId::new(),
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            source: non_blank(self.source),
            role: non_blank(self.role),
            requirement: non_blank(self.requirement),
            message: self.message,
            status: ContactStatus::New,
            created_at: now,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
