use crate::{error::AppError, AppState};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_url: String,
    pub original_url: String,
    pub short_id: String,
    pub created_at: DateTime<Utc>,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ShortenForm {
    #[serde(rename = "originalUrl")]
    pub original_url: Option<String>,
}

/// POST /shorten
///
/// Body: `{"originalUrl": "<http(s) URL>"}`, or the same field as an
/// `application/x-www-form-urlencoded` form. Answers 201 for a new link and
/// 200 when the URL was already shortened.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let original_url = original_url(request).await?;
    let shortened = state.shortener.shorten(&original_url)?;
    let record = shortened.record;

    let (status, message) = if shortened.is_new {
        (StatusCode::CREATED, "URL shortened successfully")
    } else {
        (StatusCode::OK, "URL already shortened")
    };

    Ok((
        status,
        Json(ShortenResponse {
            short_url: state.config.short_url(&record.identifier),
            original_url: record.target_url,
            short_id: record.identifier,
            created_at: record.created_at,
            message,
        }),
    ))
}

/// Pull `originalUrl` out of a form or JSON body.
async fn original_url(request: Request) -> Result<String, AppError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let Form(form) = Form::<ShortenForm>::from_request(request, &())
            .await
            .map_err(|e| AppError::InvalidInput(e.body_text()))?;
        return form
            .original_url
            .ok_or_else(|| AppError::InvalidInput("originalUrl is required".into()));
    }

    let Json(body) = Json::<Value>::from_request(request, &())
        .await
        .map_err(|e| AppError::InvalidInput(e.body_text()))?;

    match body.get("originalUrl") {
        None | Some(Value::Null) => Err(AppError::InvalidInput("originalUrl is required".into())),
        Some(Value::String(url)) => Ok(url.clone()),
        Some(_) => Err(AppError::InvalidInput("originalUrl must be a string".into())),
    }
}
