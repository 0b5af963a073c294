//! OpenAI's hosted chat-completions API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::client::{ChatStream, ClientOptions, HttpClient, endpoint_url, secret_header};
use crate::connection_string::ConnectionString;
use crate::error::Result;
use crate::providers::ChatCompletion;
use crate::types::{ChatCompletionRequest, ChatMessage, ExecutionSettings};

/// A client for `POST {endpoint}/chat/completions`.
///
/// The key is sent as a bearer token and the model travels in the body.
pub struct OpenAi {
    http: HttpClient,
    url: Url,
    key: String,
    model: String,
}

impl OpenAi {
    pub fn new(
        connection: &ConnectionString,
        model: &str,
        options: ClientOptions,
    ) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(&options)?,
            url: endpoint_url(connection.endpoint(), &["chat", "completions"])?,
            key: connection.key().to_string(),
            model: model.to_string(),
        })
    }

    /// The URL requests are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChatCompletion for OpenAi {
    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(
        &self,
        transcript: &[ChatMessage],
        settings: &ExecutionSettings,
    ) -> Result<ChatStream> {
        let auth = secret_header(&format!("Bearer {}", self.key))?;
        let request = ChatCompletionRequest::streaming(Some(&self.model), transcript, settings);
        self.http
            .stream(
                self.provider_name(),
                &self.model,
                &self.url,
                (AUTHORIZATION, auth),
                &request,
            )
            .await
    }
}
