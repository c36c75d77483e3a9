//! Session state kept outside the request pipeline: stored credentials and
//! the navigation hook used for forced logout.

mod navigator;
mod store;

pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use store::{CredentialStore, KeyringStore, MemoryStore, TOKEN_KEY, USER_KEY};
