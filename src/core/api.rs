use crate::domain::model::{
    EntityKind, InterviewAnswer, InterviewResult, InterviewSession, Notification, Record,
};
use crate::domain::ports::{ConfigProvider, ResourceSource};
use crate::utils::error::{DeskError, Result};
use crate::utils::validation;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Upper bound on `next` links followed for one collection.
const MAX_LIST_PAGES: usize = 500;

const INTERVIEW_APP_PREFIX: &str = "/interview_app";

/// Token-authenticated client for the recruiting backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    endpoints: HashMap<EntityKind, String>,
}

impl ApiClient {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        validation::validate_url("api_base", config.api_base_url())?;

        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let endpoints = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, config.endpoint_for(*kind)))
            .collect();

        Ok(Self {
            client,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            token: config.auth_token().map(str::to_string),
            endpoints,
        })
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn endpoint(&self, kind: EntityKind) -> &str {
        self.endpoints
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_endpoint())
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn detail_path(&self, kind: EntityKind, id: &str) -> String {
        format!("{}/{}/", self.endpoint(kind).trim_end_matches('/'), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.header("Authorization", format!("Token {}", token)),
            None => request,
        }
    }

    /// Maps non-success statuses onto the error categories the UI reacts to.
    async fn check_status(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!("Authentication rejected ({}) for {}", status.as_u16(), url);
                Err(DeskError::AuthError {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(DeskError::ValidationError {
                    fields: parse_field_errors(&body),
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(DeskError::HttpStatusError {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body,
                })
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &str) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!("API response status: {} ({})", response.status(), url);
        let response = Self::check_status(response, url).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        self.send_json(self.request(Method::GET, &url), &url).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        self.send_json(self.request(Method::POST, &url).json(body), &url)
            .await
    }

    /// For endpoints that may answer 204 or an ignorable body.
    async fn post_discarding(&self, path: &str, body: &Value) -> Result<()> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        let response = self.request(Method::POST, &url).json(body).send().await?;
        Self::check_status(response, &url).await?;
        Ok(())
    }

    /// Fetches a whole collection, following paginated `next` links.
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut next = Some(self.url(self.endpoint(kind)));
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_LIST_PAGES {
                tracing::warn!("Stopped following pagination for {} after {} pages", kind, MAX_LIST_PAGES);
                break;
            }

            let body: Value = self.get_json(&url).await?;
            let (items, next_url) = split_list_body(body, &url)?;
            for item in items {
                match Record::from_value(item) {
                    Some(record) => records.push(record),
                    None => tracing::warn!("Skipping non-object item in {} response", kind),
                }
            }
            next = next_url;
        }

        tracing::debug!("Fetched {} {} records", records.len(), kind);
        Ok(records)
    }

    pub async fn get(&self, kind: EntityKind, id: &str) -> Result<Record> {
        let path = self.detail_path(kind, id);
        match self.get_json::<Value>(&path).await {
            Ok(body) => Record::from_value(body).ok_or_else(|| DeskError::ResponseShapeError {
                url: self.url(&path),
                message: "expected a JSON object".to_string(),
            }),
            Err(DeskError::HttpStatusError { status: 404, .. }) => Err(DeskError::NotFoundError {
                kind: kind.label().to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, kind: EntityKind, body: &Value) -> Result<Record> {
        let path = self.endpoint(kind).to_string();
        let created: Value = self.post_json(&path, body).await?;
        Record::from_value(created).ok_or_else(|| DeskError::ResponseShapeError {
            url: self.url(&path),
            message: "expected the created object".to_string(),
        })
    }

    /// Partial update; the backend answers with the full updated object.
    pub async fn update(&self, kind: EntityKind, id: &str, body: &Value) -> Result<Record> {
        let url = self.url(&self.detail_path(kind, id));
        tracing::debug!("PATCH {}", url);
        let updated: Value = self
            .send_json(self.request(Method::PATCH, &url).json(body), &url)
            .await?;
        Record::from_value(updated).ok_or_else(|| DeskError::ResponseShapeError {
            url,
            message: "expected the updated object".to_string(),
        })
    }

    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let url = self.url(&self.detail_path(kind, id));
        tracing::debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, &url).send().await?;
        match Self::check_status(response, &url).await {
            Ok(_) => Ok(()),
            Err(DeskError::HttpStatusError { status: 404, .. }) => Err(DeskError::NotFoundError {
                kind: kind.label().to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let body: Value = self.get_json("/api/notifications/").await?;
        let (items, _) = split_list_body(body, "/api/notifications/")?;
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<()> {
        self.post_discarding(&format!("/api/notifications/{}/mark_read/", id), &Value::Null)
            .await
    }

    pub async fn interview_session(&self, session_key: &str) -> Result<InterviewSession> {
        self.get_json(&format!("{}/sessions/{}/", INTERVIEW_APP_PREFIX, session_key))
            .await
    }

    /// Sends the captured ID document reference for verification.
    pub async fn verify_identity(&self, session_key: &str, payload: &Value) -> Result<bool> {
        let body: Value = self
            .post_json(
                &format!("{}/sessions/{}/verify-id/", INTERVIEW_APP_PREFIX, session_key),
                payload,
            )
            .await?;
        Ok(body.get("verified").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn submit_answer(&self, session_key: &str, answer: &InterviewAnswer) -> Result<()> {
        self.post_discarding(
            &format!("{}/sessions/{}/answers/", INTERVIEW_APP_PREFIX, session_key),
            &serde_json::to_value(answer)?,
        )
        .await
    }

    /// Closes the session and returns the session id results are filed under.
    pub async fn complete_interview(&self, session_key: &str) -> Result<String> {
        let body: Value = self
            .post_json(
                &format!("{}/sessions/{}/complete/", INTERVIEW_APP_PREFIX, session_key),
                &Value::Null,
            )
            .await?;
        body.get("session_id")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| DeskError::ResponseShapeError {
                url: self.url(&format!("{}/sessions/{}/complete/", INTERVIEW_APP_PREFIX, session_key)),
                message: "missing session_id".to_string(),
            })
    }

    pub async fn interview_results(&self, session_id: &str) -> Result<InterviewResult> {
        self.get_json(&format!("{}/results/{}/", INTERVIEW_APP_PREFIX, session_id))
            .await
    }
}

#[async_trait::async_trait]
impl ResourceSource for ApiClient {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        self.list(kind).await
    }
}

/// Accepts a bare array or a paginated `{"results": [...], "next": ...}` object.
fn split_list_body(body: Value, url: &str) -> Result<(Vec<Value>, Option<String>)> {
    match body {
        Value::Array(items) => Ok((items, None)),
        Value::Object(mut obj) => match obj.remove("results") {
            Some(Value::Array(items)) => {
                let next = obj
                    .get("next")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                Ok((items, next))
            }
            _ => Err(DeskError::ResponseShapeError {
                url: url.to_string(),
                message: "expected an array or an object with 'results'".to_string(),
            }),
        },
        _ => Err(DeskError::ResponseShapeError {
            url: url.to_string(),
            message: "expected an array or an object with 'results'".to_string(),
        }),
    }
}

/// Field-level messages from a 400 body such as `{"email": ["Enter a valid email."]}`.
fn parse_field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => {
            for (field, value) in obj {
                let messages = match value {
                    Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    Value::String(s) => vec![s],
                    other => vec![other.to_string()],
                };
                fields.insert(field, messages);
            }
        }
        Ok(Value::Array(items)) => {
            let messages = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            fields.insert("non_field_errors".to_string(), messages);
        }
        _ if !body.trim().is_empty() => {
            fields.insert("non_field_errors".to_string(), vec![body.trim().to_string()]);
        }
        _ => {
            fields.insert("non_field_errors".to_string(), vec!["Invalid request".to_string()]);
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        let config = CliConfig {
            api_base: Some(server.base_url()),
            token: token.map(str::to_string),
            ..CliConfig::default()
        };
        ApiClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_parse_field_errors() {
        let fields = parse_field_errors(r#"{"email": ["Enter a valid email address."], "phone": "Required"}"#);
        assert_eq!(fields["email"], vec!["Enter a valid email address."]);
        assert_eq!(fields["phone"], vec!["Required"]);

        let fields = parse_field_errors("plain failure");
        assert_eq!(fields["non_field_errors"], vec!["plain failure"]);
    }

    #[test]
    fn test_split_list_body_shapes() {
        let (items, next) = split_list_body(json!([{"id": 1}]), "u").unwrap();
        assert_eq!(items.len(), 1);
        assert!(next.is_none());

        let (items, next) =
            split_list_body(json!({"results": [{"id": 1}, {"id": 2}], "next": "http://x/?page=2"}), "u").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(next.as_deref(), Some("http://x/?page=2"));

        assert!(split_list_body(json!({"detail": "nope"}), "u").is_err());
        assert!(split_list_body(json!("text"), "u").is_err());
    }

    #[tokio::test]
    async fn test_list_sends_token_header() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/candidates/")
                .header("Authorization", "Token secret");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!([
                    {"id": 1, "full_name": "John Smith"},
                    {"id": 2, "full_name": "Johnny Lee"},
                    "not-an-object"
                ]));
        });

        let client = client_for(&server, Some("secret"));
        let records = client.list(EntityKind::Candidates).await.unwrap();

        api_mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_list_follows_pagination() {
        let server = MockServer::start();
        let next_url = server.url("/api/jobs/cursor/?page=2");
        let first = server.mock(|when, then| {
            when.method(GET).path("/api/jobs/");
            then.status(200).json_body(json!({
                "count": 3,
                "next": next_url,
                "results": [{"id": 1}, {"id": 2}]
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET).path("/api/jobs/cursor/").query_param("page", "2");
            then.status(200).json_body(json!({"count": 3, "next": null, "results": [{"id": 3}]}));
        });

        let client = client_for(&server, Some("secret"));
        let records = client.list(EntityKind::Jobs).await.unwrap();

        first.assert();
        second.assert();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/jobs/");
            then.status(401).json_body(json!({"detail": "Invalid token."}));
        });

        let client = client_for(&server, Some("expired"));
        let err = client.list(EntityKind::Jobs).await.unwrap_err();
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_create_validation_error_keeps_fields() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/candidates/");
            then.status(400).json_body(json!({"email": ["This field is required."]}));
        });

        let client = client_for(&server, Some("secret"));
        let err = client
            .create(EntityKind::Candidates, &json!({"full_name": "No Email"}))
            .await
            .unwrap_err();

        match err {
            DeskError::ValidationError { fields } => {
                assert_eq!(fields["email"], vec!["This field is required."]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_missing_record_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/companies/42/");
            then.status(404).json_body(json!({"detail": "Not found."}));
        });

        let client = client_for(&server, Some("secret"));
        let err = client.get(EntityKind::Companies, "42").await.unwrap_err();
        assert!(matches!(err, DeskError::NotFoundError { .. }));
    }
}
