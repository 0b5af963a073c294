//! Azure OpenAI deployments.

use async_trait::async_trait;
use reqwest::header::HeaderName;
use url::Url;

use crate::client::{ChatStream, ClientOptions, HttpClient, endpoint_url, secret_header};
use crate::connection_string::ConnectionString;
use crate::error::Result;
use crate::providers::ChatCompletion;
use crate::types::{ChatCompletionRequest, ChatMessage, ExecutionSettings};

const API_KEY: &str = "api-key";

/// A client for one Azure OpenAI deployment.
///
/// Requests go to
/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
/// with the key in the `api-key` header. The deployment selects the model, so
/// the body carries none.
pub struct AzureOpenAi {
    http: HttpClient,
    url: Url,
    key: String,
    deployment: String,
}

impl AzureOpenAi {
    pub fn new(
        connection: &ConnectionString,
        deployment: &str,
        api_version: &str,
        options: ClientOptions,
    ) -> Result<Self> {
        let mut url = endpoint_url(
            connection.endpoint(),
            &["openai", "deployments", deployment, "chat", "completions"],
        )?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(Self {
            http: HttpClient::new(&options)?,
            url,
            key: connection.key().to_string(),
            deployment: deployment.to_string(),
        })
    }

    /// The URL requests are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAi {
    fn provider_name(&self) -> &str {
        "Azure OpenAI"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn stream_chat(
        &self,
        transcript: &[ChatMessage],
        settings: &ExecutionSettings,
    ) -> Result<ChatStream> {
        let auth = secret_header(&self.key)?;
        let request = ChatCompletionRequest::streaming(None, transcript, settings);
        self.http
            .stream(
                self.provider_name(),
                &self.deployment,
                &self.url,
                (HeaderName::from_static(API_KEY), auth),
                &request,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_names_deployment_and_version() {
        let connection =
            ConnectionString::parse("Endpoint=https://my-resource.openai.azure.com/;Key=k")
                .unwrap();
        let client =
            AzureOpenAi::new(&connection, "gpt-35-turbo", "2024-02-01", ClientOptions::new())
                .unwrap();
        assert_eq!(
            client.url().as_str(),
            "https://my-resource.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-02-01"
        );
        assert_eq!(client.model(), "gpt-35-turbo");
    }
}
