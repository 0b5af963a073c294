use serde::Deserialize;
use serde_json::Value;

/// Error envelope returned by both OpenAI and Azure OpenAI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorResponse {
    /// The error details, when the body follows the documented shape.
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// The `error` object of an [`ErrorResponse`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorDetail {
    /// Error category, e.g. `invalid_request_error`.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,

    /// Offending request parameter.
    #[serde(default)]
    pub param: Option<String>,

    /// Provider error code; a string on OpenAI, sometimes a number on Azure.
    #[serde(default)]
    pub code: Option<Value>,
}

impl ErrorDetail {
    /// The error code rendered as text.
    pub fn code_str(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn openai_error_body() {
        let body: ErrorResponse = serde_json::from_value(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        }))
        .unwrap();
        let detail = body.error.unwrap();
        assert_eq!(detail.message.as_deref(), Some("Incorrect API key provided"));
        assert_eq!(detail.error_type.as_deref(), Some("invalid_request_error"));
        assert_eq!(detail.param, None);
        assert_eq!(detail.code_str().as_deref(), Some("invalid_api_key"));
    }

    #[test]
    fn azure_error_body_with_numeric_code() {
        let body: ErrorResponse = serde_json::from_value(json!({
            "error": {"code": 429, "message": "Rate limit is exceeded."}
        }))
        .unwrap();
        let detail = body.error.unwrap();
        assert_eq!(detail.code_str().as_deref(), Some("429"));
        assert_eq!(detail.error_type, None);
    }
}
