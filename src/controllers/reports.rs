use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{num, AppState, MessageResponse};
use crate::auth::{authenticate, require_admin};
use crate::entities::{Report, ReportKind, ReportStatus};
use crate::errors::ApiError;
use crate::handlers::{parse_id, FileReportInput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportDto {
    id: String,
    kind: ReportKind,
    comment_id: String,
    post_id: String,
    reported_by: String,
    reason: String,
    comment_content: String,
    status: ReportStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<Report> for ReportDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id.to_string(),
            kind: r.kind,
            comment_id: r.comment_id.to_string(),
            post_id: r.post_id.to_string(),
            reported_by: r.reported_by,
            reason: r.reason,
            comment_content: r.snapshot,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileReportBody {
    comment_id: Option<String>,
    post_id: Option<String>,
    reason: Option<String>,
    comment_content: Option<String>,
}

pub(crate) async fn file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FileReportBody>,
) -> Result<(StatusCode, Json<ReportDto>), ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;

    let report = state
        .handler
        .file_report(
            &claims,
            FileReportInput {
                comment_id: body.comment_id,
                post_id: body.post_id,
                reason: body.reason,
                snapshot: body.comment_content,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(report.into())))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportsResponse {
    reports: Vec<ReportDto>,
    total_reports: u64,
    total_pages: u64,
    current_page: u64,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    require_admin(&*state.handler.user_repository, &claims).await?;

    let page = state
        .handler
        .list_reports(
            num(&params.page),
            num(&params.limit),
            params.status.as_deref(),
        )
        .await?;

    Ok(Json(ReportsResponse {
        reports: page.reports.into_iter().map(ReportDto::from).collect(),
        total_reports: page.total_reports,
        total_pages: page.total_pages,
        current_page: page.current_page,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetStatusBody {
    status: Option<String>,
}

pub(crate) async fn set_status(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    require_admin(&*state.handler.user_repository, &claims).await?;

    let id = parse_id(&report_id, "reportId")?;
    let status = state
        .handler
        .set_report_status(id, body.status.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: format!("report marked {}.", status.as_str()),
    }))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    require_admin(&*state.handler.user_repository, &claims).await?;

    let id = parse_id(&report_id, "reportId")?;
    state.handler.delete_report(id).await?;

    Ok(Json(MessageResponse {
        message: "report deleted.".to_owned(),
    }))
}
