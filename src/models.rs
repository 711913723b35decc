use serde::{Deserialize, Deserializer, Serialize};

use crate::config::RequestDefaults;
use crate::error::ApiError;

pub const MIN_MAX_TOKENS: i64 = 1;
pub const MAX_MAX_TOKENS: i64 = 1000;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

// Body of POST /api/v1/infer as received, before validation.
// Outer None: field omitted. Some(None): explicit null.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct InferPayload {
    pub prompt: String,
    #[serde(default, deserialize_with = "present")]
    pub max_tokens: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub temperature: Option<Option<f64>>,
}

// only runs for keys that are in the body, so null lands as Some(None)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// A validated inference request. Omitted fields carry the request defaults;
// None means the client sent null and the model picks.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    prompt: String,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
}

impl InferenceRequest {
    pub fn new(
        prompt: impl Into<String>,
        max_tokens: Option<i64>,
        temperature: Option<f64>,
    ) -> Result<Self, ApiError> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(ApiError::Validation(
                "prompt: must contain at least 1 character".to_string(),
            ));
        }

        let max_tokens = match max_tokens {
            Some(n) if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&n) => {
                return Err(ApiError::Validation(format!(
                    "max_tokens: must be between {MIN_MAX_TOKENS} and {MAX_MAX_TOKENS}, got {n}"
                )));
            }
            // range checked above
            Some(n) => Some(n as u32),
            None => None,
        };

        if let Some(t) = temperature {
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
                return Err(ApiError::Validation(format!(
                    "temperature: must be between {MIN_TEMPERATURE:?} and {MAX_TEMPERATURE:?}, got {t}"
                )));
            }
        }

        Ok(Self {
            prompt,
            max_tokens,
            temperature,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn from_payload(
        payload: InferPayload,
        defaults: &RequestDefaults,
    ) -> Result<Self, ApiError> {
        let max_tokens = payload
            .max_tokens
            .unwrap_or(Some(i64::from(defaults.max_tokens)));
        let temperature = payload.temperature.unwrap_or(Some(defaults.temperature));
        Self::new(payload.prompt, max_tokens, temperature)
    }
}

// What the model produced for one call
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceResult {
    pub output: String,
    pub tokens_used: u64,
    pub model_name: String,
    pub model_version: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub output: String,
    pub tokens_used: u64,
    pub model_version: String,
}

impl From<&InferenceResult> for CacheEntry {
    fn from(result: &InferenceResult) -> Self {
        Self {
            output: result.output.clone(),
            tokens_used: result.tokens_used,
            model_version: result.model_version.clone(),
        }
    }
}

// Body of a successful POST /api/v1/infer
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct InferenceResponse {
    pub output: String,
    pub tokens_used: u64,
    pub model_version: String,
}

impl From<CacheEntry> for InferenceResponse {
    fn from(entry: CacheEntry) -> Self {
        Self {
            output: entry.output,
            tokens_used: entry.tokens_used,
            model_version: entry.model_version,
        }
    }
}

// Body of GET /api/v1/model
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_version: String,
    pub status: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_max_tokens(n: i64) -> Result<InferenceRequest, ApiError> {
        InferenceRequest::new("hi", Some(n), None)
    }

    fn with_temperature(t: f64) -> Result<InferenceRequest, ApiError> {
        InferenceRequest::new("hi", None, Some(t))
    }

    #[test]
    fn max_tokens_bounds() {
        assert!(with_max_tokens(0).is_err());
        assert!(with_max_tokens(1001).is_err());
        assert_eq!(with_max_tokens(1).unwrap().max_tokens(), Some(1));
        assert_eq!(with_max_tokens(1000).unwrap().max_tokens(), Some(1000));
    }

    #[test]
    fn temperature_bounds() {
        assert!(with_temperature(-0.01).is_err());
        assert!(with_temperature(2.01).is_err());
        assert!(with_temperature(0.0).is_ok());
        assert!(with_temperature(2.0).is_ok());
    }

    #[test]
    fn prompt_must_not_be_empty() {
        assert!(matches!(
            InferenceRequest::new("", None, None),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(InferenceRequest::new("a", None, None).unwrap().prompt(), "a");
    }

    fn parse(body: &str, defaults: &RequestDefaults) -> InferenceRequest {
        let payload: InferPayload = serde_json::from_str(body).unwrap();
        InferenceRequest::from_payload(payload, defaults).unwrap()
    }

    #[test]
    fn omitted_fields_take_request_defaults() {
        let request = parse(r#"{"prompt": "hello"}"#, &RequestDefaults::default());
        assert_eq!(request.max_tokens(), Some(100));
        assert_eq!(request.temperature(), Some(0.7));

        let custom = RequestDefaults {
            max_tokens: 64,
            temperature: 1.5,
        };
        let request = parse(r#"{"prompt": "hello"}"#, &custom);
        assert_eq!(request.max_tokens(), Some(64));
        assert_eq!(request.temperature(), Some(1.5));
    }

    #[test]
    fn explicit_null_is_left_for_the_model() {
        let request = parse(
            r#"{"prompt": "hello", "max_tokens": null, "temperature": null}"#,
            &RequestDefaults::default(),
        );
        assert_eq!(request.max_tokens(), None);
        assert_eq!(request.temperature(), None);
    }

    #[test]
    fn explicit_values_win_over_defaults() {
        let request = parse(
            r#"{"prompt": "hello", "max_tokens": 7, "temperature": 0.0}"#,
            &RequestDefaults::default(),
        );
        assert_eq!(request.max_tokens(), Some(7));
        assert_eq!(request.temperature(), Some(0.0));
    }

    #[test]
    fn out_of_range_defaults_are_rejected() {
        let payload: InferPayload = serde_json::from_str(r#"{"prompt": "hello"}"#).unwrap();
        let bad = RequestDefaults {
            max_tokens: 5000,
            temperature: 0.7,
        };
        assert!(InferenceRequest::from_payload(payload, &bad).is_err());
    }

    #[test]
    fn cache_entry_json_shape() {
        let entry = CacheEntry {
            output: "out".into(),
            tokens_used: 7,
            model_version: "1.0.0".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"output": "out", "tokens_used": 7, "model_version": "1.0.0"})
        );
    }
}
