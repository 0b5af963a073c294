use serde::{Deserialize, Serialize};

/// Optional sampling parameters sent with a chat request.
///
/// The default value leaves every parameter to the provider, which is what the
/// interactive chat sends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Maximum number of tokens in the reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ExecutionSettings {
    /// Settings that defer everything to the provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the nucleus sampling value.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the maximum number of reply tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn default_serializes_empty() {
        assert_eq!(to_value(ExecutionSettings::new()).unwrap(), json!({}));
    }

    #[test]
    fn builder_sets_fields() {
        let settings = ExecutionSettings::new()
            .with_temperature(0.5)
            .with_top_p(0.25)
            .with_max_tokens(64);
        assert_eq!(
            to_value(&settings).unwrap(),
            json!({
                "temperature": 0.5,
                "top_p": 0.25,
                "max_tokens": 64
            })
        );
    }
}
