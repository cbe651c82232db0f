//! Response DTOs for the sobject and query endpoints.
//!
//! # Design
//! Record bodies stay as `serde_json::Value` because object schemas are
//! org-specific. Only the envelopes the client itself inspects are typed.
//! These mirror the mock-server's payloads but are defined independently;
//! integration tests catch schema drift.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by a successful sobject POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateResult {
    pub id: String,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<Value>,
}

fn default_success() -> bool {
    true
}

/// One page of SOQL query results.
///
/// `next_records_url` is exposed as returned; the client does not follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_records_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_result_tolerates_missing_total_size() {
        let result: QueryResult = serde_json::from_str(r#"{"records":[],"done":true}"#).unwrap();
        assert_eq!(result.total_size, 0);
        assert!(result.done);
        assert!(result.records.is_empty());
        assert!(result.next_records_url.is_none());
    }

    #[test]
    fn query_result_reads_next_records_url() {
        let result: QueryResult = serde_json::from_str(
            r#"{
                "totalSize": 3000,
                "done": false,
                "nextRecordsUrl": "/services/data/v59.0/query/01gxx-2000",
                "records": [{"attributes":{"type":"Lead"},"Name":"Ada"}]
            }"#,
        )
        .unwrap();
        assert_eq!(result.total_size, 3000);
        assert!(!result.done);
        assert_eq!(
            result.next_records_url.as_deref(),
            Some("/services/data/v59.0/query/01gxx-2000")
        );
        assert_eq!(result.records[0]["Name"], "Ada");
    }

    #[test]
    fn create_result_defaults_success() {
        let result: CreateResult = serde_json::from_str(r#"{"id":"00Qxx0000001"}"#).unwrap();
        assert_eq!(result.id, "00Qxx0000001");
        assert!(result.success);
        assert!(result.errors.is_empty());
    }
}
