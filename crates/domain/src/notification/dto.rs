use std::collections::HashMap;

use serde::Deserialize;
use store::NotificationType;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

fn default_priority() -> String {
    "NORMAL".to_string()
}

/// A notification sent directly through the API.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotificationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub recipient_email: String,
    #[validate(custom(function = "not_blank", message = "Recipient name is required"))]
    pub recipient_name: String,
    pub notification_type: NotificationType,
    #[validate(custom(function = "not_blank", message = "Subject is required"))]
    pub subject: String,
    pub message: Option<String>,
    pub reference_id: Option<String>,
    pub template_name: Option<String>,
    #[serde(default)]
    pub template_data: HashMap<String, serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: String,
}

impl NotificationRequest {
    pub fn template(&self) -> Option<&str> {
        self.template_name.as_deref().filter(|t| !t.is_empty())
    }

    pub fn body(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}
