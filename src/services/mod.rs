//! Typed wrappers over the REST endpoints the front end calls.
//!
//! Each service holds a clone of the [`crate::ApiClient`] it was created from,
//! so every call goes through the same pipeline, cache and credentials.

mod analytics;
mod feedback;
mod profile;
mod upload;

pub use analytics::{AnalyticsOverview, AnalyticsService, TrendPoint, TrendRange};
pub use feedback::{Feedback, FeedbackPage, FeedbackService, NewFeedback};
pub use profile::{Credentials, ProfileService, UserProfile};
pub use upload::{content_type_for, Analysis, UploadService, UploadedFile};
