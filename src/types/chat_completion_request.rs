use serde::Serialize;

use crate::types::{ChatMessage, ExecutionSettings};

/// Body of a streaming `chat/completions` request.
///
/// Borrowed from the transcript so a request never copies the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model name. Azure routes by deployment instead and leaves this unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,

    /// The full transcript, oldest first.
    pub messages: &'a [ChatMessage],

    /// Optional sampling parameters.
    #[serde(flatten)]
    pub settings: &'a ExecutionSettings,

    /// Always true; replies are consumed as server-sent events.
    pub stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Create a streaming request over `messages`.
    pub fn streaming(
        model: Option<&'a str>,
        messages: &'a [ChatMessage],
        settings: &'a ExecutionSettings,
    ) -> Self {
        Self {
            model,
            messages,
            settings,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn openai_request_serialization() {
        let messages = vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")];
        let settings = ExecutionSettings::default();
        let request = ChatCompletionRequest::streaming(Some("gpt-3.5-turbo"), &messages, &settings);

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "Be brief."},
                    {"role": "user", "content": "Hello"}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn azure_request_omits_model_and_flattens_settings() {
        let messages = vec![ChatMessage::user("Hello")];
        let settings = ExecutionSettings::new().with_max_tokens(16);
        let request = ChatCompletionRequest::streaming(None, &messages, &settings);

        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "messages": [{"role": "user", "content": "Hello"}],
                "max_tokens": 16,
                "stream": true
            })
        );
    }
}
