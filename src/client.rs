//! API client for the ClassDesk REST endpoints.
//!
//! The client is built explicitly and passed to whatever needs it; there is no
//! global instance. Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod error_classification;
pub mod signals;

pub use builder::ApiClientBuilder;
pub use self::core::ApiClient;
pub use error_classification::{classify, policy_for, ErrorClassifier, StatusPolicy};
pub use signals::SignalsSnapshot;
