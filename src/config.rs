//! Application settings.
//!
//! Settings live in two groups, `AI` and `ConnectionStrings`, read from an
//! optional settings file (`appsettings.json` in the working directory by
//! default) and then overridden from the environment using the
//! `Section__Key` naming convention, e.g. `ConnectionStrings__openAi`.
//! Setting names are case-insensitive in both places.
//!
//! ```json
//! {
//!   "AI": {
//!     "azureoropenai": "Azure",
//!     "azurechatdeploymentname": "gpt-35-turbo"
//!   },
//!   "ConnectionStrings": {
//!     "azureOpenAi": "Endpoint=https://my-resource.openai.azure.com/;Key=..."
//!   }
//! }
//! ```

use std::io;
use std::path::Path;

use figment::providers::{Env, Format, Json, Serialized, Yaml};
use figment::value::{Dict, Map, Value};
use figment::{Figment, Metadata, Profile, Provider};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings file consulted when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Provider chosen when `AI:AzureOrOpenAI` is unset.
pub const DEFAULT_PROVIDER: &str = "OpenAI";

/// Azure deployment used when `AI:AzureChatDeploymentName` is unset.
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-35-turbo";

/// OpenAI model used when `AI:OpenAiChatModel` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Azure OpenAI REST API version used when `AI:AzureApiVersion` is unset.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// System message that opens every conversation unless `AI:SystemPrompt` is set.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a useful chatbot. You always reply with a single sentence.";

/// Setting names as they appear in error messages.
pub const AZURE_CONNECTION_STRING_SETTING: &str = "ConnectionStrings:azureOpenAi";
/// Setting name of the OpenAI connection string.
pub const OPENAI_CONNECTION_STRING_SETTING: &str = "ConnectionStrings:openAi";

/// The `AI` settings group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    /// `Azure` or `OpenAI`, case-insensitive.
    #[serde(rename = "AzureOrOpenAI", default, skip_serializing_if = "Option::is_none")]
    pub azure_or_openai: Option<String>,

    /// Azure OpenAI deployment to chat with.
    #[serde(
        rename = "AzureChatDeploymentName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub azure_chat_deployment_name: Option<String>,

    /// OpenAI model to chat with.
    #[serde(rename = "openaichatmodel", default, skip_serializing_if = "Option::is_none")]
    pub openai_chat_model: Option<String>,

    /// Azure OpenAI REST API version.
    #[serde(rename = "azureapiversion", default, skip_serializing_if = "Option::is_none")]
    pub azure_api_version: Option<String>,

    /// System message that fixes the assistant's behavior.
    #[serde(rename = "systemprompt", default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// The `ConnectionStrings` settings group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStrings {
    /// Azure OpenAI connection string.
    #[serde(rename = "azureopenai", default, skip_serializing_if = "Option::is_none")]
    pub azure_openai: Option<String>,

    /// OpenAI connection string.
    #[serde(rename = "openai", default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

/// All settings, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// The `AI` group.
    #[serde(rename = "ai", default)]
    pub ai: AiSettings,

    /// The `ConnectionStrings` group.
    #[serde(rename = "connectionstrings", default)]
    pub connection_strings: ConnectionStrings,
}

impl Configuration {
    /// Loads settings from a file and the process environment.
    ///
    /// With `path == None` the loader looks for [`DEFAULT_SETTINGS_FILE`] in the
    /// working directory and silently falls back to defaults when it is absent.
    /// An explicitly named file must exist. Environment variables that are not
    /// valid UTF-8 are skipped.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = match path {
            Some(path) => Self::file_figment(path)?,
            None => merge_settings_file(Self::defaults(), Path::new(DEFAULT_SETTINGS_FILE)),
        };
        Ok(figment.merge(CaseFolded(environment())).extract()?)
    }

    /// Reads a settings file. `.yaml` and `.yml` files are parsed as YAML,
    /// everything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::file_figment(path.as_ref())?.extract()?)
    }

    /// Parses settings from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(Self::defaults()
            .merge(CaseFolded(Json::string(content)))
            .extract()?)
    }

    /// Parses settings from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::defaults()
            .merge(CaseFolded(Yaml::string(content)))
            .extract()?)
    }

    fn defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(Configuration::default()))
    }

    fn file_figment(path: &Path) -> Result<Figment> {
        if !path.is_file() {
            return Err(Error::io(
                format!("failed to read {}", path.display()),
                io::Error::from(io::ErrorKind::NotFound),
            ));
        }
        Ok(merge_settings_file(Self::defaults(), path))
    }

    /// Overrides the provider selection.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.ai.azure_or_openai = Some(provider.into());
        self
    }

    /// Overrides the model or deployment name of the selected provider.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if self.selects_azure() {
            self.ai.azure_chat_deployment_name = Some(model);
        } else {
            self.ai.openai_chat_model = Some(model);
        }
        self
    }

    /// Sets the Azure connection string.
    pub fn with_azure_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_strings.azure_openai = Some(connection_string.into());
        self
    }

    /// Sets the OpenAI connection string.
    pub fn with_openai_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_strings.openai = Some(connection_string.into());
        self
    }

    /// The provider selection as configured, or [`DEFAULT_PROVIDER`].
    pub fn provider(&self) -> &str {
        self.ai.azure_or_openai.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// True when the provider selection is `azure` in any letter casing.
    pub fn selects_azure(&self) -> bool {
        self.provider().eq_ignore_ascii_case("azure")
    }

    /// The Azure deployment name, or [`DEFAULT_AZURE_DEPLOYMENT`].
    pub fn azure_chat_deployment_name(&self) -> &str {
        self.ai
            .azure_chat_deployment_name
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_DEPLOYMENT)
    }

    /// The OpenAI model name, or [`DEFAULT_OPENAI_MODEL`].
    pub fn openai_chat_model(&self) -> &str {
        self.ai
            .openai_chat_model
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_MODEL)
    }

    /// The Azure REST API version, or [`DEFAULT_AZURE_API_VERSION`].
    pub fn azure_api_version(&self) -> &str {
        self.ai
            .azure_api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION)
    }

    /// The system prompt, or [`DEFAULT_SYSTEM_PROMPT`].
    pub fn system_prompt(&self) -> &str {
        self.ai
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// The Azure connection string, if configured.
    pub fn azure_connection_string(&self) -> Option<&str> {
        self.connection_strings.azure_openai.as_deref()
    }

    /// The OpenAI connection string, if configured.
    pub fn openai_connection_string(&self) -> Option<&str> {
        self.connection_strings.openai.as_deref()
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn merge_settings_file(figment: Figment, path: &Path) -> Figment {
    if is_yaml(path) {
        figment.merge(CaseFolded(Yaml::file(path)))
    } else {
        figment.merge(CaseFolded(Json::file(path)))
    }
}

/// `AI__*` and `ConnectionStrings__*` variables, nested at each `__`.
fn environment() -> Env {
    Env::raw()
        .filter(|name| {
            let name = name.as_str().to_ascii_lowercase();
            name.starts_with("ai__") || name.starts_with("connectionstrings__")
        })
        .split("__")
}

/// Lowercases every key a provider yields so that setting names match in any
/// casing.
struct CaseFolded<P>(P);

impl<P: Provider> Provider for CaseFolded<P> {
    fn metadata(&self) -> Metadata {
        self.0.metadata()
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        Ok(self
            .0
            .data()?
            .into_iter()
            .map(|(profile, dict)| (profile, fold_dict(dict)))
            .collect())
    }

    fn profile(&self) -> Option<Profile> {
        self.0.profile()
    }
}

fn fold_dict(dict: Dict) -> Dict {
    dict.into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), fold_value(value)))
        .collect()
}

fn fold_value(value: Value) -> Value {
    match value {
        Value::Dict(tag, dict) => Value::Dict(tag, fold_dict(dict)),
        other => other,
    }
}
