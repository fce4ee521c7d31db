//! REST client for the benefit backend
//!
//! Identity mode posts `{"rut": "12345678-5"}` to `/totem/validate` and
//! `{"rut", "entity_id"}` to `/totem/confirm`; ticket mode posts
//! `{"ticket_id": "<uuid>"}` to `/tickets/validate` and `/tickets/redeem`.
//! Error bodies carry `{code, message}` (or `error`/`detail`), which become a
//! `ValidationFailure` for classification.

use crate::flow::service::{
    FlowMode, ScannedValue, ValidatedEntity, ValidationFailure, ValidationService,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Paths relative to the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub validate: String,
    pub confirm: String,
}

impl Endpoints {
    pub fn for_mode(mode: FlowMode) -> Self {
        match mode {
            FlowMode::Identity => Self {
                validate: "totem/validate".to_string(),
                confirm: "totem/confirm".to_string(),
            },
            FlowMode::Ticket => Self {
                validate: "tickets/validate".to_string(),
                confirm: "tickets/redeem".to_string(),
            },
        }
    }
}

pub struct HttpValidationService {
    base_url: String,
    token: Option<String>,
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl HttpValidationService {
    pub fn new(base_url: &str, mode: FlowMode) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            endpoints: Endpoints::for_mode(mode),
            client,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ValidationFailure> {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| transport_failure(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| transport_failure(&e))?;
        log::debug!("POST {} -> {}", path, status);

        if !status.is_success() {
            return Err(failure_from_response(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            ValidationFailure::new(format!("Malformed response from backend: {}", e))
                .with_code("unknown")
                .with_status(status.as_u16())
        })
    }
}

fn request_body(value: &ScannedValue) -> Value {
    match value {
        ScannedValue::Identity(id) => json!({ "rut": id.to_string() }),
        ScannedValue::Ticket(ticket) => json!({ "ticket_id": ticket.hyphenated().to_string() }),
    }
}

fn transport_failure(error: &reqwest::Error) -> ValidationFailure {
    let message = if error.is_timeout() {
        format!("Request timed out: {}", error)
    } else if error.is_connect() {
        format!("Cannot connect to backend: {}", error)
    } else {
        format!("Network error: {}", error)
    };
    ValidationFailure::new(message).with_code("network_error")
}

/// Build a failure from a non-success response
///
/// Accepts `{code, message}`, `{error: {code, message}}`, `{error: "..."}` and
/// `{detail: "..."}`; a non-JSON body becomes the message as is.
pub fn failure_from_response(status: u16, body: &str) -> ValidationFailure {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let object = parsed.as_ref().map(|value| match value.get("error") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    });

    let field = |key: &str| {
        object
            .and_then(|o| o.get(key))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let code = field("code");
    let message = field("message")
        .or_else(|| field("error"))
        .or_else(|| field("detail"))
        .or_else(|| {
            let trimmed = body.trim();
            (parsed.is_none() && !trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("Backend returned status {}", status));

    let failure = ValidationFailure::new(message).with_status(status);
    match code {
        Some(code) => failure.with_code(code),
        None => failure,
    }
}

#[async_trait]
impl ValidationService for HttpValidationService {
    async fn validate(&self, value: &ScannedValue) -> Result<ValidatedEntity, ValidationFailure> {
        let response = self.post(&self.endpoints.validate, request_body(value)).await?;
        Ok(ValidatedEntity::from_json(response))
    }

    async fn confirm(
        &self,
        value: &ScannedValue,
        entity: &ValidatedEntity,
    ) -> Result<(), ValidationFailure> {
        let mut body = request_body(value);
        if let Some(object) = body.as_object_mut() {
            object.insert("entity_id".to_string(), json!(entity.id));
        }
        self.post(&self.endpoints.confirm, body).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::error::{FlowError, FlowErrorKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response, returning the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{}", addr), task)
    }

    fn identity() -> ScannedValue {
        ScannedValue::Identity("12345678-5".parse().unwrap())
    }

    #[test]
    fn test_failure_from_structured_body() {
        let failure = failure_from_response(
            409,
            r#"{"code": "no_stock", "message": "Sin cajas disponibles"}"#,
        );
        assert_eq!(failure.code.as_deref(), Some("no_stock"));
        assert_eq!(failure.message, "Sin cajas disponibles");
        assert_eq!(failure.status, Some(409));
        assert_eq!(FlowError::from(&failure).kind, FlowErrorKind::NoStock);
    }

    #[test]
    fn test_failure_from_nested_and_plain_bodies() {
        let nested = failure_from_response(
            400,
            r#"{"error": {"code": "TICKET_EXPIRED", "message": "Ticket vencido"}}"#,
        );
        assert_eq!(nested.code.as_deref(), Some("TICKET_EXPIRED"));
        assert_eq!(FlowError::from(&nested).kind, FlowErrorKind::Expired);

        let detail = failure_from_response(404, r#"{"detail": "Trabajador no existe"}"#);
        assert_eq!(detail.message, "Trabajador no existe");
        assert_eq!(FlowError::from(&detail).kind, FlowErrorKind::NotFound);

        let plain = failure_from_response(400, r#"{"message": "Sin stock disponible"}"#);
        assert_eq!(plain.code, None);
        assert_eq!(FlowError::from(&plain).kind, FlowErrorKind::NoStock);

        let html = failure_from_response(502, "Bad Gateway");
        assert_eq!(html.message, "Bad Gateway");
        assert_eq!(FlowError::from(&html).kind, FlowErrorKind::NetworkError);

        let empty = failure_from_response(500, "");
        assert_eq!(empty.message, "Backend returned status 500");
        assert_eq!(FlowError::from(&empty).kind, FlowErrorKind::Unknown);
    }

    #[test]
    fn test_urls_and_bodies() {
        let service = HttpValidationService::new("https://api.example.cl/v1/", FlowMode::Ticket);
        assert_eq!(
            service.url(&service.endpoints.validate),
            "https://api.example.cl/v1/tickets/validate"
        );
        assert_eq!(request_body(&identity()), json!({"rut": "12345678-5"}));
    }

    #[tokio::test]
    async fn test_validate_success() {
        let (base, server) =
            serve_once("200 OK", r#"{"data": {"id": "w-9", "nombre": "Juan Perez"}}"#).await;
        let service = HttpValidationService::new(&base, FlowMode::Identity).with_token("secret");

        let entity = service.validate(&identity()).await.unwrap();
        assert_eq!(entity.id, "w-9");
        assert_eq!(entity.holder.as_deref(), Some("Juan Perez"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /totem/validate"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""rut":"12345678-5""#));
    }

    #[tokio::test]
    async fn test_validate_rejection() {
        let (base, _server) = serve_once(
            "409 Conflict",
            r#"{"code": "already_used", "message": "Ya retiró su caja"}"#,
        )
        .await;
        let service = HttpValidationService::new(&base, FlowMode::Identity);

        let failure = service.validate(&identity()).await.unwrap_err();
        assert_eq!(failure.status, Some(409));
        assert_eq!(FlowError::from(&failure).kind, FlowErrorKind::AlreadyUsed);
    }

    #[tokio::test]
    async fn test_confirm_sends_entity_id() {
        let (base, server) = serve_once("204 No Content", "").await;
        let service = HttpValidationService::new(&base, FlowMode::Identity);
        let entity = ValidatedEntity::from_json(json!({"id": "w-9"}));

        service.confirm(&identity(), &entity).await.unwrap();
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /totem/confirm"));
        assert!(request.contains(r#""entity_id":"w-9""#));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpValidationService::new(&format!("http://{}", addr), FlowMode::Ticket);
        let failure = service.validate(&identity()).await.unwrap_err();
        assert_eq!(failure.code.as_deref(), Some("network_error"));
        assert_eq!(FlowError::from(&failure).kind, FlowErrorKind::NetworkError);
    }
}
