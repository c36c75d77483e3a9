use crate::client::ApiClient;
use crate::types::ApiRequest;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    #[serde(default)]
    pub total_submissions: u64,
    #[serde(default)]
    pub graded_submissions: u64,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub active_students: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendRange {
    Week,
    Month,
    Semester,
}

impl TrendRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendRange::Week => "7d",
            TrendRange::Month => "30d",
            TrendRange::Semester => "semester",
        }
    }
}

impl fmt::Display for TrendRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7d" | "week" => Ok(TrendRange::Week),
            "30d" | "month" => Ok(TrendRange::Month),
            "semester" | "term" => Ok(TrendRange::Semester),
            other => Err(Error::validation(format!(
                "unknown trend range '{}' (expected 7d, 30d or semester)",
                other
            ))),
        }
    }
}

/// Analytics dashboard endpoints. Both reads are cacheable.
pub struct AnalyticsService {
    client: ApiClient,
}

impl AnalyticsService {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn overview(&self) -> Result<AnalyticsOverview> {
        self.client.fetch("/analytics/overview").await
    }

    pub async fn trends(&self, range: TrendRange) -> Result<Vec<TrendPoint>> {
        let response = self
            .client
            .send(ApiRequest::get("/analytics/trends").query("range", range.as_str()))
            .await?;
        // some deployments wrap the series as {"points": [...]}
        let body = match response.body {
            Value::Object(mut obj) => obj.remove("points").unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        Ok(serde_json::from_value(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_parsing() {
        assert_eq!("week".parse::<TrendRange>().unwrap(), TrendRange::Week);
        assert_eq!("30D".parse::<TrendRange>().unwrap(), TrendRange::Month);
        assert_eq!(TrendRange::Semester.to_string(), "semester");
        assert!("decade".parse::<TrendRange>().is_err());
    }
}
