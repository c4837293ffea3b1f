//! Error handler for itdesk.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::ticket::TicketStatus;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("error parsing form data")]
    ParsingForm(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    /// Store could not be reached or the statement failed.
    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    /// Lookup by id, number or inventory code yields nothing.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A conditional write affected zero rows.
    #[error("{0}")]
    Conflict(String),

    #[error("ticket cannot move from `{from}` to `{to}`")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    /// Uniqueness violation on create. Cause is logged, never returned.
    #[error("{0} already exists")]
    Constraint(&'static str),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("invalid 'Authorization' header")]
    Unauthorized,

    #[error("insufficient role for this action")]
    Forbidden,
}

impl ServerError {
    /// Turn a uniqueness violation into [`ServerError::Constraint`].
    ///
    /// Any other error is kept as is.
    pub fn constraint(err: SQLxError, entity: &'static str) -> Self {
        if crate::database::is_unique_violation(&err) {
            tracing::warn!(error = %err, entity, "uniqueness violation");
            ServerError::Constraint(entity)
        } else {
            ServerError::Sql(err)
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Update `type` field.
    pub fn kind(mut self, kind: &str) -> Self {
        self.r#type = Some(kind.into());
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response.errors(validation_errors),

            ServerError::ParsingForm(err) => response
                .title("Server error during data parsing.")
                .details(&err.to_string()),

            ServerError::NotFound(_) => response
                .kind("not_found")
                .title("Nothing matches the requested target.")
                .status(StatusCode::NOT_FOUND),

            ServerError::Conflict(_) | ServerError::InvalidTransition { .. } => response
                .kind("conflict")
                .title("Could not complete the action, the target changed meanwhile.")
                .status(StatusCode::CONFLICT),

            ServerError::Constraint(_) => response
                .kind("constraint")
                .title("Could not complete the action.")
                .status(StatusCode::CONFLICT),

            ServerError::Sql(err) => {
                tracing::error!(error = %err, "store request failed");

                ResponseError::default()
                    .kind("store_unavailable")
                    .title("Could not complete the action, retry later.")
                    .status(StatusCode::SERVICE_UNAVAILABLE)
            },

            ServerError::Unauthorized => response
                .title("Missing or invalid 'Authorization' header.")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::Forbidden => response
                .title("This action requires another role.")
                .status(StatusCode::FORBIDDEN),

            ServerError::Crypto(err) => {
                tracing::error!(error = %err, "cryptographic operation failed");

                ResponseError::default()
            },

            ServerError::Internal { details, source } => {
                tracing::error!(err = ?source, %details, "server returned 500 status");

                ResponseError::default()
            },

            _ => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ServerError::NotFound("ticket"), StatusCode::NOT_FOUND),
            (
                ServerError::Conflict("ticket already claimed".into()),
                StatusCode::CONFLICT,
            ),
            (
                ServerError::InvalidTransition {
                    from: TicketStatus::Closed,
                    to: TicketStatus::Open,
                },
                StatusCode::CONFLICT,
            ),
            (ServerError::Constraint("equipment"), StatusCode::CONFLICT),
            (ServerError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServerError::Forbidden, StatusCode::FORBIDDEN),
            (
                ServerError::Sql(SQLxError::PoolTimedOut),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_transition_message() {
        let err = ServerError::InvalidTransition {
            from: TicketStatus::Closed,
            to: TicketStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "ticket cannot move from `closed` to `in_progress`"
        );
    }
}
