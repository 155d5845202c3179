//! HttpRemoteGateway - REST implementation of `RemoteGateway`.

use crate::config::ClientConfig;
use crate::dto::{
    CreateConversationBody, ExchangeBody, SendMessageBody, WireConversation, WireError,
    WireMessage, WireProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use confab_core::conversation::{Conversation, Message};
use confab_core::provider::{OAuthStart, ProviderConnection};
use confab_core::{ConfabError, RemoteGateway, Result, SendMessageRequest};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Longest slice of an unstructured error body surfaced to the user.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Gateway that talks to the backend over HTTPS with a bearer token.
#[derive(Clone)]
pub struct HttpRemoteGateway {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRemoteGateway {
    /// Creates a gateway for `config`.
    ///
    /// Without a token, requests go out unauthenticated and the backend is
    /// expected to answer `NotAuthenticated`.
    pub fn new(config: &ClientConfig, api_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfabError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            api_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConfabError::config("api_base_url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("[Gateway] {} {}", method, url.path());
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = map_http_error(status, &body);
        tracing::warn!("[Gateway] Request failed with {}: {}", status, error);
        Err(error)
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ConfabError::server(format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn create_conversation(&self, title: &str, tools: &[String]) -> Result<Conversation> {
        let url = self.endpoint(&["conversations"])?;
        let body = CreateConversationBody { title, tools };
        let wire: WireConversation = self
            .execute_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(wire.into())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        let url = self.endpoint(&["conversations", &request.conversation_id, "messages"])?;
        let body = SendMessageBody {
            text: &request.text,
            tools: &request.tools,
            location: request.location.map(Into::into),
        };
        let wire: WireMessage = self
            .execute_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(wire.into_message(&request.conversation_id))
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(before) = before {
                query.append_pair("before", &before.to_rfc3339_opts(SecondsFormat::Micros, true));
            }
        }
        let wire: Vec<WireMessage> = self.execute_json(self.request(Method::GET, url)).await?;
        Ok(wire
            .into_iter()
            .map(|m| m.into_message(conversation_id))
            .collect())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let url = self.endpoint(&["conversations"])?;
        let wire: Vec<WireConversation> = self.execute_json(self.request(Method::GET, url)).await?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn list_providers(&self) -> Result<Vec<ProviderConnection>> {
        let url = self.endpoint(&["providers"])?;
        let wire: Vec<WireProvider> = self.execute_json(self.request(Method::GET, url)).await?;
        Ok(wire.into_iter().map(Into::into).collect())
    }

    async fn start_provider_oauth(&self, provider: &str) -> Result<OAuthStart> {
        let url = self.endpoint(&["providers", provider, "oauth", "start"])?;
        self.execute_json(self.request(Method::POST, url)).await
    }

    async fn exchange_provider_oauth(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<ProviderConnection> {
        let url = self.endpoint(&["providers", provider, "oauth", "exchange"])?;
        let body = ExchangeBody { code, state };
        let wire: WireProvider = self
            .execute_json(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(wire.into())
    }

    async fn disconnect_provider(&self, provider: &str) -> Result<()> {
        let url = self.endpoint(&["providers", provider])?;
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> ConfabError {
    if err.is_timeout() {
        ConfabError::network("Request timed out")
    } else if err.is_connect() {
        ConfabError::network(format!("Connection failed: {}", err))
    } else {
        ConfabError::network(format!("Request failed: {}", err))
    }
}

/// Maps a non-success HTTP status and its body onto the error taxonomy.
pub(crate) fn map_http_error(status: StatusCode, body: &str) -> ConfabError {
    let parsed: WireError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let expired = parsed.code.as_deref() == Some("token_expired")
                || message.to_lowercase().contains("expired");
            if expired {
                ConfabError::TokenExpired
            } else {
                ConfabError::NotAuthenticated
            }
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ConfabError::network(format!("Timed out: {}", message))
        }
        s if s.is_client_error() => ConfabError::validation(message),
        _ => ConfabError::server(message),
    }
}
