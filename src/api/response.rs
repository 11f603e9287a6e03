//! API response types
//!
//! ```json
//! {"status": "ok", "data": {...}}
//! {"status": "error", "code": "DYN_VALIDATION_FAILED", "status_code": 422,
//!  "message": "...", "violations": [...]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiError;
use crate::schema::Violation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    Error {
        code: String,
        status_code: u16,
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        violations: Vec<Violation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response::Ok {
            data,
            request_id: None,
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Response::Error {
            code: err.code().to_string(),
            status_code: err.status_code(),
            message: err.to_string(),
            violations: err.violations().to_vec(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        match &mut self {
            Response::Ok { request_id, .. } | Response::Error { request_id, .. } => {
                *request_id = Some(id.into())
            }
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    /// Serializes to a single JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","code":"DYN_INTERNAL","status_code":500,"message":"response serialization failed: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use serde_json::json;

    #[test]
    fn test_success_response() {
        let json: Value = serde_json::from_str(&Response::success(json!([1])).to_json()).unwrap();
        assert_eq!(json, json!({"status": "ok", "data": [1]}));
    }

    #[test]
    fn test_error_response_with_violations() {
        let err: ApiError = ServiceError::Rejected(vec![Violation::missing("age")]).into();
        let response = Response::error(&err).with_request_id("r-1");
        assert!(!response.is_success());

        let json: Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "DYN_VALIDATION_FAILED");
        assert_eq!(json["status_code"], 422);
        assert_eq!(json["request_id"], "r-1");
        assert_eq!(
            json["violations"],
            json!([{"field": "age", "reason": "MissingRequiredField"}])
        );
    }

    #[test]
    fn test_plain_error_omits_violations() {
        let json: Value =
            serde_json::from_str(&Response::error(&ApiError::invalid_request("bad")).to_json()).unwrap();
        assert!(json.get("violations").is_none());
    }
}
