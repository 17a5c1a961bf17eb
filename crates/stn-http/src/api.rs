//! Ingestion endpoints. Every handler authorizes the public id before looking at the body.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, FormRejection, QueryRejection},
        multipart::MultipartRejection,
        Form, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use stn_core::{
    dispatch::Format,
    domain::Subscription,
    ingest::{InboundFile, InboundMessage},
    Error,
};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse {
    pub ok: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            ok: true,
            message: message.to_string(),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            ok: false,
            message: message.to_string(),
        }
    }
}

/// Core error rendered as a status code plus `ApiResponse` body.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::NotFoundOrUnauthorized => {
                (StatusCode::NOT_FOUND, "Invalid UUID or not subscribed".to_string())
            }
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Crypto(_) => (StatusCode::BAD_REQUEST, "Failed to decrypt message".to_string()),
            other => {
                error!(error = %other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to deliver message".to_string(),
                )
            }
        };
        (status, Json(ApiResponse::failure(&message))).into_response()
    }
}

type ApiResult = Result<Json<ApiResponse>, ApiError>;

fn invalid(message: &str) -> ApiError {
    ApiError(Error::Validation(message.to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JsonMessage {
    pub encrypted: bool,
    pub format: String,
    pub msg: String,
}

/// Query-string and form payloads; every field arrives as text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FieldMessage {
    pub msg: String,
    pub encrypted: String,
    pub format: String,
}

impl FieldMessage {
    fn into_inbound(self) -> Result<InboundMessage, ApiError> {
        let encrypted = parse_flag(&self.encrypted).ok_or_else(|| invalid("Invalid encrypted flag"))?;
        let format = if self.format.trim().is_empty() {
            Format::Markdown
        } else {
            Format::parse(&self.format)
        };
        Ok(InboundMessage {
            msg: self.msg,
            encrypted,
            format,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "f" | "0" => Some(false),
        "true" | "t" | "1" => Some(true),
        _ => None,
    }
}

async fn authorized(state: &AppState, public_id: &str) -> Result<Subscription, ApiError> {
    match state.ingestor.authorize(public_id).await? {
        Some(sub) => Ok(sub),
        None => {
            warn!("delivery attempt for unknown or disabled public id");
            Err(ApiError(Error::NotFoundOrUnauthorized))
        }
    }
}

async fn relay(state: &AppState, sub: &Subscription, inbound: InboundMessage) -> ApiResult {
    state.ingestor.relay_message(sub, inbound).await?;
    Ok(Json(ApiResponse::ok("Message sent")))
}

/// POST /api/{public_id}/json
///
/// The body is parsed as JSON whatever its declared content type.
pub async fn ingest_json(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let sub = authorized(&state, &public_id).await?;
    let req: JsonMessage = body
        .map_err(|e| {
            debug!(error = %e, "failed to read json body");
            invalid("Invalid JSON")
        })
        .and_then(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| {
                debug!(error = %e, "rejected json body");
                invalid("Invalid JSON")
            })
        })?;
    let inbound = InboundMessage {
        msg: req.msg,
        encrypted: req.encrypted,
        format: Format::parse(&req.format),
    };
    relay(&state, &sub, inbound).await
}

/// GET /api/{public_id}/get
pub async fn ingest_query(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    query: Result<Query<FieldMessage>, QueryRejection>,
) -> ApiResult {
    let sub = authorized(&state, &public_id).await?;
    let Query(fields) = query.map_err(|_| invalid("Invalid message"))?;
    relay(&state, &sub, fields.into_inbound()?).await
}

/// POST /api/{public_id}/form
pub async fn ingest_form(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    form: Result<Form<FieldMessage>, FormRejection>,
) -> ApiResult {
    let sub = authorized(&state, &public_id).await?;
    let Form(fields) = form.map_err(|_| invalid("Invalid message"))?;
    relay(&state, &sub, fields.into_inbound()?).await
}

/// POST /api/{public_id}/file (multipart `file`, optional `caption`)
pub async fn ingest_file(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult {
    let sub = authorized(&state, &public_id).await?;
    let mut multipart = multipart.map_err(|_| invalid("Invalid file"))?;

    let mut file = None;
    let mut caption = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!(error = %e, "multipart read failed");
        invalid("Invalid file")
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("file")
                    .to_string();
                let bytes = field.bytes().await.map_err(|_| invalid("Invalid file"))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("caption") => {
                caption = Some(field.text().await.map_err(|_| invalid("Invalid file"))?);
            }
            _ => {}
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(invalid("Invalid file"));
    };
    state
        .ingestor
        .relay_file(
            &sub,
            InboundFile {
                file_name,
                bytes,
                caption,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok("File sent")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("yes"), None);
    }

    #[test]
    fn field_messages_default_to_markdown() {
        let inbound = FieldMessage {
            msg: "x".to_string(),
            ..FieldMessage::default()
        }
        .into_inbound()
        .unwrap();
        assert_eq!(inbound.format, Format::Markdown);
        assert!(!inbound.encrypted);

        let inbound = FieldMessage {
            msg: "x".to_string(),
            format: "bogus".to_string(),
            encrypted: "true".to_string(),
        }
        .into_inbound()
        .unwrap();
        assert_eq!(inbound.format, Format::Plain);
        assert!(inbound.encrypted);
    }
}
