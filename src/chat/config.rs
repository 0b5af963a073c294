//! Command-line options for the chat binary.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`ChatConfig`], which layers its overrides on top of the settings file and
//! environment.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::config::Configuration;
use crate::error::Result;

/// Command-line arguments for the consoleai tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Settings file to read instead of `appsettings.json`.
    #[arrrg(optional, "Settings file, JSON or YAML (default: appsettings.json)", "PATH")]
    pub config: Option<String>,

    /// Provider override.
    #[arrrg(optional, "Provider to use: Azure or OpenAI", "NAME")]
    pub provider: Option<String>,

    /// Model or deployment override.
    #[arrrg(optional, "OpenAI model or Azure deployment name", "NAME")]
    pub model: Option<String>,

    /// Request log.
    #[arrrg(optional, "Append requests and streamed replies to this file", "PATH")]
    pub log: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat run.
///
/// Everything here comes from the command line and takes precedence over the
/// settings file and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Settings file; `None` means `appsettings.json` if it exists.
    pub settings_path: Option<PathBuf>,

    /// Overrides `AI:AzureOrOpenAI`.
    pub provider: Option<String>,

    /// Overrides the model or deployment of the selected provider.
    pub model: Option<String>,

    /// Where to write the JSON-lines request log, if anywhere.
    pub log_path: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a config with no overrides and colors enabled.
    pub fn new() -> Self {
        Self {
            settings_path: None,
            provider: None,
            model: None,
            log_path: None,
            use_color: true,
        }
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Applies the command-line overrides to loaded settings.
    ///
    /// The provider is overridden first so that the model lands on the
    /// provider that ends up selected.
    pub fn apply(&self, mut settings: Configuration) -> Configuration {
        if let Some(provider) = &self.provider {
            settings = settings.with_provider(provider.as_str());
        }
        if let Some(model) = &self.model {
            settings = settings.with_model(model.as_str());
        }
        settings
    }

    /// Loads the settings file and environment, then applies the overrides.
    pub fn load_configuration(&self) -> Result<Configuration> {
        let settings = Configuration::load(self.settings_path.as_deref())?;
        Ok(self.apply(settings))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            settings_path: args.config.map(PathBuf::from),
            provider: args.provider,
            model: args.model,
            log_path: args.log.map(PathBuf::from),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.settings_path.is_none());
        assert!(config.provider.is_none());
        assert!(config.model.is_none());
        assert!(config.log_path.is_none());
        assert!(config.use_color);
        assert_eq!(config, ChatConfig::from(ChatArgs::default()));
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            config: Some("settings.yaml".to_string()),
            provider: Some("Azure".to_string()),
            model: Some("chat-deployment".to_string()),
            log: Some("chat.jsonl".to_string()),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.settings_path, Some(PathBuf::from("settings.yaml")));
        assert_eq!(config.provider.as_deref(), Some("Azure"));
        assert_eq!(config.model.as_deref(), Some("chat-deployment"));
        assert_eq!(config.log_path, Some(PathBuf::from("chat.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_settings_path("appsettings.Development.json")
            .with_provider("OpenAI")
            .with_model("gpt-4o")
            .with_log_path("chat.jsonl")
            .without_color();
        assert_eq!(
            config.settings_path,
            Some(PathBuf::from("appsettings.Development.json"))
        );
        assert_eq!(config.provider.as_deref(), Some("OpenAI"));
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.log_path, Some(PathBuf::from("chat.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn overrides_beat_settings() {
        let settings = Configuration::from_json(
            r#"{"AI": {"AzureOrOpenAI": "OpenAI", "OpenAiChatModel": "gpt-4"}}"#,
        )
        .unwrap();
        let settings = ChatConfig::new()
            .with_provider("azure")
            .with_model("my-deployment")
            .apply(settings);
        assert!(settings.selects_azure());
        assert_eq!(settings.azure_chat_deployment_name(), "my-deployment");
        assert_eq!(settings.openai_chat_model(), "gpt-4");
    }

    #[test]
    fn no_overrides_leave_settings_alone() {
        let settings = Configuration::default().with_openai_connection_string("x");
        assert_eq!(ChatConfig::new().apply(settings.clone()), settings);
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        let config =
            ChatConfig::new().with_settings_path("/nonexistent/consoleai/appsettings.json");
        assert!(config.load_configuration().is_err());
    }
}
