use async_trait::async_trait;

use crate::cache::format_float;
use crate::config::ModelSettings;
use crate::error::ModelError;
use crate::models::{InferenceResult, ModelInfo};

const PROMPT_PREVIEW_CHARS: usize = 100;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn info(&self) -> ModelInfo;

    fn name(&self) -> &str;

    fn version(&self) -> &str;

    async fn predict(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f64>,
    ) -> Result<InferenceResult, ModelError>;
}

pub struct PlaceholderModel {
    settings: ModelSettings,
}

impl PlaceholderModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }
}

// ~4 chars per input token, plus min(max_tokens, input + 10) generated
pub fn estimate_tokens(prompt: &str, max_tokens: u32) -> u64 {
    let input = (prompt.chars().count() / 4) as u64;
    let generated = u64::from(max_tokens).min(input + 10);
    input + generated
}

#[async_trait]
impl InferenceModel for PlaceholderModel {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.settings.name.clone(),
            model_version: self.settings.version.clone(),
            status: "ready".to_string(),
            description: format!(
                "Placeholder model - {} v{}",
                self.settings.name, self.settings.version
            ),
        }
    }

    fn name(&self) -> &str {
        &self.settings.name
    }

    fn version(&self) -> &str {
        &self.settings.version
    }

    async fn predict(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
        temperature: Option<f64>,
    ) -> Result<InferenceResult, ModelError> {
        let max_tokens = max_tokens.unwrap_or(self.settings.default_max_tokens);
        let temperature = temperature.unwrap_or(self.settings.default_temperature);

        tokio::time::sleep(self.settings.latency).await;

        let tokens_used = estimate_tokens(prompt, max_tokens);
        let prompt_chars = prompt.chars().count();
        let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        let ellipsis = if prompt_chars > PROMPT_PREVIEW_CHARS { "..." } else { "" };

        let temp = format_float(temperature);
        let output = format!(
            "Model response to: {preview}{ellipsis}\n\n\
             [This is a placeholder response. Real model would generate actual AI output here.]\n\
             [Prompt length: {prompt_chars} chars, Tokens: ~{tokens_used}, Temp: {temp}]"
        );

        Ok(InferenceResult {
            output,
            tokens_used,
            model_name: self.settings.name.clone(),
            model_version: self.settings.version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn model() -> PlaceholderModel {
        PlaceholderModel::new(ModelSettings {
            version: "2.1.0".into(),
            latency: Duration::from_millis(100),
            ..ModelSettings::default()
        })
    }

    #[test]
    fn token_arithmetic() {
        let prompt = "What is artificial intelligence?"; // 32 chars
        assert_eq!(estimate_tokens(prompt, 50), 8 + 18);
        assert_eq!(estimate_tokens(prompt, 5), 8 + 5);
        assert_eq!(estimate_tokens("a", 1000), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn predict_uses_defaults_for_missing_params() {
        let result = model().predict("hello there", None, None).await.unwrap();
        // 11 chars -> 2 input, min(1000, 12) generated
        assert_eq!(result.tokens_used, 14);
        assert_eq!(result.model_version, "2.1.0");
        assert_eq!(result.model_name, "default-model");
        assert!(result.output.ends_with("Temp: 0.7]"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_temperature_is_kept() {
        let result = model().predict("hello", Some(10), Some(0.0)).await.unwrap();
        assert!(result.output.ends_with("Temp: 0.0]"));
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_temperature_prints_like_python() {
        let result = model().predict("hello", Some(10), Some(0.00001)).await.unwrap();
        assert!(result.output.ends_with("Temp: 1e-05]"));
    }

    #[tokio::test(start_paused = true)]
    async fn long_prompts_are_truncated_in_output() {
        let prompt = "x".repeat(150);
        let result = model().predict(&prompt, Some(10), None).await.unwrap();
        let expected_head = format!("Model response to: {}...\n\n", "x".repeat(100));
        assert!(result.output.starts_with(&expected_head));
        assert!(result.output.contains("[Prompt length: 150 chars, Tokens: ~47,"));
    }

    #[tokio::test(start_paused = true)]
    async fn predict_takes_configured_latency() {
        let start = tokio::time::Instant::now();
        model().predict("hi", None, None).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn info_describes_model() {
        let info = model().info();
        assert_eq!(info.status, "ready");
        assert_eq!(info.description, "Placeholder model - default-model v2.1.0");
    }
}
