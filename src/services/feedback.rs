use crate::client::ApiClient;
use crate::types::ApiRequest;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FEEDBACK_PATH: &str = "/feedback";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields this client does not model yet.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackPage {
    pub page: u32,
    pub items: Vec<Feedback>,
    pub total: Option<u64>,
}

impl FeedbackPage {
    /// Accepts a bare array or an object carrying `items` (or `data`) and an optional `total`.
    fn from_body(page: u32, body: Value) -> Result<Self> {
        let (items, total) = match body {
            Value::Array(_) => (body, None),
            Value::Object(mut obj) => {
                let total = obj.get("total").and_then(Value::as_u64);
                let items = obj
                    .remove("items")
                    .or_else(|| obj.remove("data"))
                    .unwrap_or(Value::Array(Vec::new()));
                (items, total)
            }
            Value::Null => (Value::Array(Vec::new()), None),
            other => {
                return Err(Error::validation_with_context(
                    "unexpected feedback list payload",
                    ErrorContext::new()
                        .with_details(other.to_string())
                        .with_source("feedback_service"),
                ))
            }
        };
        Ok(Self {
            page,
            items: serde_json::from_value(items)?,
            total,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<u64>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl NewFeedback {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn for_assignment(mut self, assignment_id: u64) -> Self {
        self.assignment_id = Some(assignment_id);
        self
    }

    pub fn rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::validation_with_context(
                "feedback content must not be empty",
                ErrorContext::new().with_field_path("content"),
            ));
        }
        if let Some(r) = self.rating {
            if !(1..=5).contains(&r) {
                return Err(Error::validation_with_context(
                    format!("rating must be between 1 and 5, got {}", r),
                    ErrorContext::new().with_field_path("rating"),
                ));
            }
        }
        Ok(())
    }
}

/// Feedback endpoints.
pub struct FeedbackService {
    client: ApiClient,
}

impl FeedbackService {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// `GET /feedback?page=N`. Pages start at 1.
    pub async fn list(&self, page: u32) -> Result<FeedbackPage> {
        let page = page.max(1);
        let response = self
            .client
            .send(ApiRequest::get(FEEDBACK_PATH).query("page", page.to_string()))
            .await?;
        FeedbackPage::from_body(page, response.body)
    }

    pub async fn get(&self, id: u64) -> Result<Feedback> {
        self.client.fetch(&format!("{}/{}", FEEDBACK_PATH, id)).await
    }

    /// `POST /feedback`, then drop cached feedback lists so the next read sees the new entry.
    pub async fn submit(&self, feedback: &NewFeedback) -> Result<Feedback> {
        feedback.validate()?;
        let created: Feedback = self.client.post_json(FEEDBACK_PATH, feedback).await?;
        self.client.invalidate_cache(FEEDBACK_PATH).await?;
        Ok(created)
    }
}
