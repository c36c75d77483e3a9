//! Cache key derivation.

use crate::types::ApiRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic key for a cacheable request.
///
/// Derived from the method, the URL and the sorted query string, so two
/// requests that differ only in query insertion order share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub method: String,
    pub url: String,
}

impl CacheKey {
    pub fn for_request(request: &ApiRequest) -> Self {
        Self::from_parts(request.method.as_str(), &request.url, &request.query_string())
    }

    pub fn from_parts(method: &str, url: &str, query: &str) -> Self {
        let canonical = if query.is_empty() {
            format!("{}:{}", method, url)
        } else {
            format!("{}:{}?{}", method, url, query)
        };
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self {
            hash,
            method: method.to_string(),
            url: url.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.method, self.url, &self.hash[..12.min(self.hash.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_does_not_matter() {
        let a = ApiRequest::get("/feedback").query("page", "1").query("sort", "new");
        let b = ApiRequest::get("/feedback").query("sort", "new").query("page", "1");
        assert_eq!(CacheKey::for_request(&a), CacheKey::for_request(&b));
    }

    #[test]
    fn test_query_and_path_change_key() {
        let base = CacheKey::for_request(&ApiRequest::get("/feedback").query("page", "1"));
        let other_page = CacheKey::for_request(&ApiRequest::get("/feedback").query("page", "2"));
        let other_path = CacheKey::for_request(&ApiRequest::get("/analytics").query("page", "1"));
        assert_ne!(base, other_page);
        assert_ne!(base, other_path);
        assert_eq!(base.hash.len(), 64);
        assert_eq!(base.url, "/feedback");
    }
}
