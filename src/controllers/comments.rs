use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::posts::AuthorDto;
use super::{num, AppState, MessageResponse, PageParams};
use crate::auth::{authenticate, require_admin};
use crate::entities::Comment;
use crate::errors::ApiError;
use crate::handlers::{parse_id, NewCommentInput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentDto {
    id: String,
    post_id: String,
    author: AuthorDto,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentDto {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id.to_string(),
            post_id: c.post_id.to_string(),
            author: c.author.into(),
            content: c.content,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCommentBody {
    post_id: Option<String>,
    content: Option<String>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateCommentBody>,
) -> Result<(StatusCode, Json<CommentDto>), ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;

    let comment = state
        .handler
        .create_comment(
            &claims,
            NewCommentInput {
                post_id: body.post_id,
                content: body.content,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentsResponse {
    comments: Vec<CommentDto>,
    total_count: u64,
    current_page: u64,
    total_pages: u64,
}

pub(crate) async fn by_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let post_id = parse_id(&id, "postId")?;

    let page = state
        .handler
        .comments_by_post(post_id, num(&params.page), num(&params.limit))
        .await?;

    Ok(Json(CommentsResponse {
        comments: page.comments.into_iter().map(CommentDto::from).collect(),
        total_count: page.total_count,
        current_page: page.current_page,
        total_pages: page.total_pages,
    }))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    require_admin(&*state.handler.user_repository, &claims).await?;

    let comment_id = parse_id(&id, "commentId")?;
    state.handler.delete_comment(comment_id).await?;

    Ok(Json(MessageResponse {
        message: "comment deleted.".to_owned(),
    }))
}
