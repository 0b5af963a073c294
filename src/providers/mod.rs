//! Chat-completion providers.
//!
//! A provider is chosen once at startup from the configuration and handed to
//! the session as a `Box<dyn ChatCompletion>`; nothing downstream branches on
//! which service is on the other end.

mod azure;
mod openai;

use std::fmt;

use async_trait::async_trait;

use crate::client::{ChatStream, ClientOptions};
use crate::config::{
    AZURE_CONNECTION_STRING_SETTING, Configuration, OPENAI_CONNECTION_STRING_SETTING,
};
use crate::connection_string::ConnectionString;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, ExecutionSettings};

pub use azure::AzureOpenAi;
pub use openai::OpenAi;

/// The one capability the session needs from a hosted model.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Human-readable service name, e.g. `Azure OpenAI`.
    fn provider_name(&self) -> &str;

    /// The model or deployment requests are sent to.
    fn model(&self) -> &str;

    /// Sends the whole transcript and streams back the reply text.
    ///
    /// The returned stream yields fragments in arrival order and ends when the
    /// service signals completion. Dropping it abandons the request.
    async fn stream_chat(
        &self,
        transcript: &[ChatMessage],
        settings: &ExecutionSettings,
    ) -> Result<ChatStream>;
}

/// Which hosted service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Azure,
    OpenAi,
}

impl ProviderKind {
    /// `azure` in any letter casing selects Azure; anything else is OpenAI.
    pub fn from_setting(setting: Option<&str>) -> Self {
        match setting {
            Some(value) if value.eq_ignore_ascii_case("azure") => ProviderKind::Azure,
            _ => ProviderKind::OpenAi,
        }
    }

    /// The setting that holds this provider's connection string.
    pub fn connection_string_setting(&self) -> &'static str {
        match self {
            ProviderKind::Azure => AZURE_CONNECTION_STRING_SETTING,
            ProviderKind::OpenAi => OPENAI_CONNECTION_STRING_SETTING,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Azure => write!(f, "Azure OpenAI"),
            ProviderKind::OpenAi => write!(f, "OpenAI"),
        }
    }
}

/// A resolved provider: kind, model or deployment, and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    kind: ProviderKind,
    model: String,
    connection: ConnectionString,
    api_version: String,
}

impl ProviderSelection {
    /// Resolves the provider the configuration asks for.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigurationMissing` when the selected provider has no
    /// connection string, and `Error::ConnectionString` when it does not parse.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        let kind = ProviderKind::from_setting(config.ai.azure_or_openai.as_deref());
        let (raw, model) = match kind {
            ProviderKind::Azure => (
                config.azure_connection_string(),
                config.azure_chat_deployment_name(),
            ),
            ProviderKind::OpenAi => (
                config.openai_connection_string(),
                config.openai_chat_model(),
            ),
        };

        let setting = kind.connection_string_setting();
        let raw = raw.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            Error::configuration_missing(
                setting,
                format!(
                    "Connection string for {kind} is missing. Add {setting} to {} or set {} in the environment.",
                    crate::config::DEFAULT_SETTINGS_FILE,
                    setting.replace(':', "__"),
                ),
            )
        })?;
        let connection = ConnectionString::parse(raw)?;

        Ok(Self {
            kind,
            model: model.to_string(),
            connection,
            api_version: config.azure_api_version().to_string(),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// The OpenAI model or the Azure deployment name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        self.connection.endpoint()
    }

    /// Builds the client for this selection.
    pub fn connect(&self, options: ClientOptions) -> Result<Box<dyn ChatCompletion>> {
        let client: Box<dyn ChatCompletion> = match self.kind {
            ProviderKind::Azure => Box::new(AzureOpenAi::new(
                &self.connection,
                &self.model,
                &self.api_version,
                options,
            )?),
            ProviderKind::OpenAi => {
                Box::new(OpenAi::new(&self.connection, &self.model, options)?)
            }
        };
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AZURE: &str = "Endpoint=https://my-resource.openai.azure.com/;Key=azure-key";
    const OPENAI: &str = "Endpoint=https://api.openai.com/v1;Key=sk-test";

    #[test]
    fn azure_selected_in_any_casing() {
        for value in ["Azure", "azure", "AZURE", "aZuRe"] {
            let config = Configuration::default()
                .with_provider(value)
                .with_azure_connection_string(AZURE);
            let selection = ProviderSelection::from_config(&config).unwrap();
            assert_eq!(selection.kind(), ProviderKind::Azure);
            assert_eq!(selection.model(), "gpt-35-turbo");
            assert_eq!(selection.endpoint(), "https://my-resource.openai.azure.com/");
        }
    }

    #[test]
    fn azure_uses_configured_deployment() {
        let config = Configuration::default()
            .with_provider("Azure")
            .with_model("chat-deployment")
            .with_azure_connection_string(AZURE);
        let selection = ProviderSelection::from_config(&config).unwrap();
        assert_eq!(selection.model(), "chat-deployment");
    }

    #[test]
    fn openai_is_the_fallback() {
        for value in [None, Some("OpenAI"), Some("something else")] {
            let mut config = Configuration::default().with_openai_connection_string(OPENAI);
            config.ai.azure_or_openai = value.map(String::from);
            let selection = ProviderSelection::from_config(&config).unwrap();
            assert_eq!(selection.kind(), ProviderKind::OpenAi);
            assert_eq!(selection.model(), "gpt-3.5-turbo");
        }

        let config = Configuration::default()
            .with_model("gpt-4o")
            .with_openai_connection_string(OPENAI);
        let selection = ProviderSelection::from_config(&config).unwrap();
        assert_eq!(selection.model(), "gpt-4o");
    }

    #[test]
    fn missing_connection_string_names_setting() {
        let config = Configuration::default()
            .with_provider("Azure")
            .with_openai_connection_string(OPENAI);
        let err = ProviderSelection::from_config(&config).unwrap_err();
        assert!(err.is_configuration_missing());
        assert_eq!(err.missing_setting(), Some("ConnectionStrings:azureOpenAi"));
        assert!(err.to_string().contains("ConnectionStrings__azureOpenAi"));

        let err = ProviderSelection::from_config(&Configuration::default()).unwrap_err();
        assert_eq!(err.missing_setting(), Some("ConnectionStrings:openAi"));
    }

    #[test]
    fn malformed_connection_string_is_reported() {
        let config = Configuration::default().with_openai_connection_string("Key=only");
        let err = ProviderSelection::from_config(&config).unwrap_err();
        assert!(err.is_connection_string());
        assert!(err.is_configuration());
    }

    #[test]
    fn connect_builds_matching_client() {
        let config = Configuration::default()
            .with_provider("azure")
            .with_azure_connection_string(AZURE);
        let client = ProviderSelection::from_config(&config)
            .unwrap()
            .connect(ClientOptions::new())
            .unwrap();
        assert_eq!(client.provider_name(), "Azure OpenAI");
        assert_eq!(client.model(), "gpt-35-turbo");

        let config = Configuration::default().with_openai_connection_string(OPENAI);
        let client = ProviderSelection::from_config(&config)
            .unwrap()
            .connect(ClientOptions::new())
            .unwrap();
        assert_eq!(client.provider_name(), "OpenAI");
        assert_eq!(client.model(), "gpt-3.5-turbo");
    }
}
