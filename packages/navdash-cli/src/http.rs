/// HTTP persistence client.
///
/// Talks to the dashboard REST API with JSON bodies. Every request carries
/// the bearer token when one is configured. Non-success statuses are mapped
/// onto `StorageError` by `status_error`.
use std::time::Duration;

use async_trait::async_trait;
use navdash_core::storage::{PersistenceClient, StorageError};
use navdash_core::types::{ConfigMap, Group, GroupId, OrderEntry, Site, SiteId};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;

#[derive(Deserialize)]
struct AuthStatus {
    authenticated: bool,
}

pub struct HttpClient {
    base: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
            client: builder.build()?,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StorageError> {
        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        log::debug!(target: "navdash.http", "{} -> {}: {}", self.base, status, body);
        Err(status_error(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StorageError> {
        self.send(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| StorageError::Transport(format!("Malformed response: {}", e)))
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), StorageError> {
        self.send(req).await.map(|_| ())
    }
}

pub fn config_key_path(key: &str) -> String {
    format!("/configs/{}", utf8_percent_encode(key, NON_ALPHANUMERIC))
}

/// Map a non-success response onto the storage error taxonomy.
/// A JSON body of the form `{"error": "..."}` supplies the message.
pub fn status_error(status: StatusCode, body: &str) -> StorageError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized(message),
        StatusCode::NOT_FOUND => StorageError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            StorageError::Validation(message)
        }
        StatusCode::CONFLICT => StorageError::Conflict(message),
        _ => StorageError::Transport(format!("{}: {}", status, message)),
    }
}

#[async_trait]
impl PersistenceClient for HttpClient {
    async fn is_authorized(&self) -> Result<bool, StorageError> {
        match self
            .send_json::<AuthStatus>(self.request(Method::GET, "/auth/status"))
            .await
        {
            Ok(status) => Ok(status.authenticated),
            Err(StorageError::Unauthorized(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        self.send_json(self.request(Method::GET, "/groups")).await
    }

    async fn list_sites(&self, group_id: GroupId) -> Result<Vec<Site>, StorageError> {
        let path = format!("/groups/{}/sites", group_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn create_group(&self, group: &Group) -> Result<Group, StorageError> {
        self.send_json(self.request(Method::POST, "/groups").json(group))
            .await
    }

    async fn update_group(&self, id: GroupId, group: &Group) -> Result<(), StorageError> {
        let path = format!("/groups/{}", id);
        self.send_empty(self.request(Method::PUT, &path).json(group))
            .await
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError> {
        let path = format!("/groups/{}", id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn create_site(&self, site: &Site) -> Result<Site, StorageError> {
        self.send_json(self.request(Method::POST, "/sites").json(site))
            .await
    }

    async fn update_site(&self, id: SiteId, site: &Site) -> Result<(), StorageError> {
        let path = format!("/sites/{}", id);
        self.send_empty(self.request(Method::PUT, &path).json(site))
            .await
    }

    async fn delete_site(&self, id: SiteId) -> Result<(), StorageError> {
        let path = format!("/sites/{}", id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn set_group_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError> {
        self.send_empty(self.request(Method::PUT, "/group-orders").json(orders))
            .await
    }

    async fn set_site_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError> {
        self.send_empty(self.request(Method::PUT, "/site-orders").json(orders))
            .await
    }

    async fn get_config(&self) -> Result<ConfigMap, StorageError> {
        self.send_json(self.request(Method::GET, "/configs")).await
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let body = serde_json::json!({ "value": value });
        self.send_empty(self.request(Method::PUT, &config_key_path(key)).json(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            StorageError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, ""),
            StorageError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, ""),
            StorageError::NotFound(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, ""),
            StorageError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, ""),
            StorageError::Validation(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, ""),
            StorageError::Conflict(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            StorageError::Transport(_)
        ));
    }

    #[test]
    fn test_error_message_from_json_body() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"error":"name is required"}"#);
        assert_eq!(err, StorageError::Validation("name is required".to_string()));
    }

    #[test]
    fn test_error_message_from_text_body() {
        let err = status_error(StatusCode::NOT_FOUND, "  no such group \n");
        assert_eq!(err, StorageError::NotFound("no such group".to_string()));
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        let err = status_error(StatusCode::UNAUTHORIZED, "");
        assert_eq!(
            err,
            StorageError::Unauthorized(StatusCode::UNAUTHORIZED.to_string())
        );
    }

    #[test]
    fn test_config_key_is_encoded() {
        assert_eq!(config_key_path("site.title"), "/configs/site%2Etitle");
        assert_eq!(config_key_path("a b/c"), "/configs/a%20b%2Fc");
    }

    #[test]
    fn test_base_trailing_slash_and_empty_token() {
        let config = ClientConfig {
            api_base: "http://nav.local/api/".into(),
            token: Some(String::new()),
            timeout_secs: Some(3),
        };
        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.base(), "http://nav.local/api");
        assert_eq!(client.url("/groups"), "http://nav.local/api/groups");
        assert!(client.token.is_none());
    }
}
