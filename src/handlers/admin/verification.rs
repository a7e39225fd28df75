use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::api::format::{PageQuery, Pagination};
use crate::database::repository::ListFilter;
use crate::database::scope::CountryScope;
use crate::error::ApiError;
use crate::handlers::present;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::verification::{StatusUpdate, VerificationRecord};
use crate::services::{DocumentType, VerificationError};
use crate::state::AppState;
use crate::types::ReviewStatus;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub country: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn parse_status(raw: &str) -> Result<ReviewStatus, VerificationError> {
    raw.parse().map_err(VerificationError::InvalidStatus)
}

async fn reload<R: VerificationRecord>(state: &AppState, id: i64) -> Result<R, ApiError> {
    R::find(state.db.pool(), id)
        .await?
        .ok_or_else(|| VerificationError::NotFound.into())
}

/// GET /api/<flow> - scoped, filtered, paginated
pub async fn list<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<R>> {
    let scope = CountryScope::for_user(&user, query.country.as_deref())?;
    let status = present(query.status)
        .map(|s| parse_status(&s))
        .transpose()?;

    let (page, limit, offset) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config.verification);

    let filter = ListFilter {
        scope,
        status,
        search: present(query.search),
        limit,
        offset,
    };
    let (rows, total) = R::list(state.db.pool(), &filter).await?;

    Ok(ApiResponse::paginated(rows, Pagination::new(page, limit, total)))
}

/// GET /api/<flow>/:id
pub async fn get<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<R> {
    let scope = CountryScope::for_user(&user, None)?;
    let record = reload::<R>(&state, id).await?;
    scope.ensure_visible(record.country(), R::KIND.label())?;
    Ok(ApiResponse::success(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
    #[serde(alias = "phone_verified")]
    pub phone_verified: Option<bool>,
    #[serde(alias = "email_verified")]
    pub email_verified: Option<bool>,
}

/// PUT /api/<flow>/:id/status
pub async fn set_status<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<R> {
    let scope = CountryScope::for_user(&user, None)?;
    let status = present(body.status)
        .ok_or_else(|| ApiError::missing_fields(&["status".to_string()]))?;

    let update = StatusUpdate {
        status: parse_status(&status)?,
        notes: body.notes,
        phone_verified: body.phone_verified,
        email_verified: body.email_verified,
    };
    let snapshot = state
        .verifications
        .set_status(R::KIND, id, &scope, user.user_id, update)
        .await?;

    let record = reload::<R>(&state, id).await?;
    Ok(ApiResponse::success(record).message(format!(
        "{} {}",
        R::KIND.label(),
        snapshot.status
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatusRequest {
    /// Only read by the body-addressed route
    pub document_type: Option<String>,
    pub status: Option<String>,
    #[serde(alias = "rejection_reason", alias = "reason")]
    pub rejection_reason: Option<String>,
}

async fn apply_document_status<R: VerificationRecord>(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    document: &str,
    body: DocumentStatusRequest,
) -> ApiResult<R> {
    let scope = CountryScope::for_user(user, None)?;
    let document = DocumentType::parse(R::KIND, document)?;
    let status = present(body.status)
        .ok_or_else(|| ApiError::missing_fields(&["status".to_string()]))?;

    state
        .verifications
        .set_document_status(
            R::KIND,
            id,
            &scope,
            user.user_id,
            document,
            parse_status(&status)?,
            body.rejection_reason,
        )
        .await?;

    let record = reload::<R>(state, id).await?;
    Ok(ApiResponse::success(record).message(format!("Document {} updated", document)))
}

/// PUT /api/<flow>/:id/documents/:docType
pub async fn set_document_status<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, document)): Path<(i64, String)>,
    Json(body): Json<DocumentStatusRequest>,
) -> ApiResult<R> {
    apply_document_status::<R>(&state, &user, id, &document, body).await
}

/// PUT /api/<flow>/:id/document-status with `documentType` in the body
pub async fn set_document_status_by_body<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<DocumentStatusRequest>,
) -> ApiResult<R> {
    let document = present(body.document_type.clone())
        .ok_or_else(|| ApiError::missing_fields(&["documentType".to_string()]))?;
    apply_document_status::<R>(&state, &user, id, &document, body).await
}

/// DELETE /api/<flow>/:id
pub async fn delete<R: VerificationRecord>(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let scope = CountryScope::for_user(&user, None)?;
    state.verifications.delete(R::KIND, id, &scope).await?;
    Ok(ApiResponse::success(serde_json::json!({ "id": id }))
        .message(format!("{} deleted", R::KIND.label())))
}
