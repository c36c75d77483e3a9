//! Request and response envelopes shared by the pipeline, transports and services.

pub mod request;
pub mod response;

pub use request::{ApiRequest, Method, MultipartField, RequestBody};
pub use response::ApiResponse;
