//! HTTP plumbing shared by the chat-completion providers.
//!
//! Both providers speak the same wire protocol: a JSON `POST` answered by a
//! `text/event-stream` body. They differ only in URL layout and in the header
//! that carries the key, which they hand to [`HttpClient::stream`].

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::{self, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use url::Url;

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletionRequest, ErrorResponse};

/// A lazy, finite stream of reply fragments for one request.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Options shared by every provider client.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Overall request timeout. `None` waits for as long as the reply streams.
    pub timeout: Option<Duration>,

    /// Receives every request, fragment and failure.
    pub logger: Option<Arc<dyn ClientLogger>>,
}

impl ClientOptions {
    /// Options with no timeout and no logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// A reqwest client plus the logger requests are reported to.
#[derive(Clone)]
pub(crate) struct HttpClient {
    client: ReqwestClient,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl HttpClient {
    pub(crate) fn new(options: &ClientOptions) -> Result<Self> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            logger: options.logger.clone(),
        })
    }

    /// Sends a streaming chat request and returns its fragments.
    ///
    /// `provider` and `model` only label the log records.
    pub(crate) async fn stream(
        &self,
        provider: &str,
        model: &str,
        url: &Url,
        auth: (HeaderName, HeaderValue),
        request: &ChatCompletionRequest<'_>,
    ) -> Result<ChatStream> {
        if let Some(logger) = &self.logger {
            logger.log_request(provider, model, request.messages, request.settings);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(auth.0, auth.1);

        CLIENT_REQUESTS.click();
        let started = Instant::now();
        let response = self
            .client
            .post(url.clone())
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(map_send_error);
        CLIENT_REQUEST_DURATION.add(started.elapsed().as_secs_f64());

        let response = match response {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(process_error_response(response).await),
            Err(err) => Err(err),
        }
        .inspect_err(|err| {
            CLIENT_REQUEST_ERRORS.click();
            if let Some(logger) = &self.logger {
                logger.log_error(err);
            }
        })?;

        let fragments = process_sse(response.bytes_stream());
        match self.logger.clone() {
            Some(logger) => Ok(Box::pin(logged(fragments, logger))),
            None => Ok(Box::pin(fragments)),
        }
    }
}

fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
    } else {
        Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
    }
}

/// Process API response errors and convert to our Error type.
async fn process_error_response(response: Response) -> Error {
    let status_code = response.status().as_u16();

    // OpenAI reports x-request-id, Azure apim-request-id.
    let request_id = ["x-request-id", "apim-request-id"]
        .iter()
        .find_map(|name| response.headers().get(*name))
        .and_then(|val| val.to_str().ok())
        .map(String::from);

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.trim().parse::<u64>().ok());

    let error_body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return Error::http_client(
                format!("Failed to read error response: {e}"),
                Some(Box::new(e)),
            );
        }
    };

    let detail = serde_json::from_str::<ErrorResponse>(&error_body)
        .ok()
        .and_then(|body| body.error);
    let error_type = detail
        .as_ref()
        .and_then(|d| d.error_type.clone().or_else(|| d.code_str()));
    let error_message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| error_body.clone());
    let error_param = detail.as_ref().and_then(|d| d.param.clone());

    // Map HTTP status code to appropriate error type
    match status_code {
        400 => Error::bad_request(error_message, error_param),
        401 => Error::authentication(error_message),
        403 => Error::permission(error_message),
        404 => Error::not_found(error_message),
        408 => Error::timeout(error_message),
        429 => Error::rate_limit(error_message, retry_after),
        500 => Error::internal_server(error_message, request_id),
        502..=504 => Error::service_unavailable(error_message, retry_after),
        _ => Error::api(status_code, error_type, error_message, request_id),
    }
}

/// Reports each fragment, the final reply and any failure to `logger`.
fn logged<S>(
    fragments: S,
    logger: Arc<dyn ClientLogger>,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<String>> + Send + 'static,
{
    let fragments = Box::pin(fragments);
    stream::unfold(
        (fragments, logger, String::new()),
        |(mut fragments, logger, mut reply)| async move {
            match fragments.next().await {
                Some(Ok(text)) => {
                    logger.log_fragment(&text);
                    reply.push_str(&text);
                    Some((Ok(text), (fragments, logger, reply)))
                }
                Some(Err(err)) => {
                    logger.log_error(&err);
                    Some((Err(err), (fragments, logger, reply)))
                }
                None => {
                    logger.log_reply(&reply);
                    None
                }
            }
        },
    )
}

/// Appends `segments` to the path of `endpoint`.
pub(crate) fn endpoint_url(endpoint: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;
    url.path_segments_mut()
        .map_err(|_| Error::url(format!("endpoint '{endpoint}' cannot carry a path"), None))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Builds a header value that is redacted from reqwest's debug output.
pub(crate) fn secret_header(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::connection_string("Key contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_appends_segments() {
        let url = endpoint_url("https://api.openai.com/v1", &["chat", "completions"]).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let url = endpoint_url("https://api.openai.com/v1/", &["chat", "completions"]).unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let url = endpoint_url("http://localhost:8080", &["chat", "completions"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/chat/completions");
    }

    #[test]
    fn endpoint_url_escapes_segments() {
        let url = endpoint_url("https://r.example/", &["deployments", "my model"]).unwrap();
        assert_eq!(url.as_str(), "https://r.example/deployments/my%20model");
    }

    #[test]
    fn secret_header_is_sensitive() {
        let value = secret_header("Bearer sk-test").unwrap();
        assert!(value.is_sensitive());
        assert!(secret_header("bad\nkey").is_err());
    }

    #[test]
    fn options_debug_hides_logger() {
        let options = ClientOptions::new().with_timeout(Duration::from_secs(5));
        assert_eq!(
            format!("{options:?}"),
            "ClientOptions { timeout: Some(5s), logger: false }"
        );
    }

    #[tokio::test]
    async fn http_client_builds_without_timeout() {
        assert!(HttpClient::new(&ClientOptions::new()).is_ok());
    }
}
