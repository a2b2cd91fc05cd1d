use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{num, AppState, MessageResponse, PageParams};
use crate::auth::authenticate;
use crate::entities::{Author, Post};
use crate::errors::ApiError;
use crate::handlers::{parse_id, FeedInput, NewPostInput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorDto {
    uid: String,
    name: String,
    email: String,
    avatar: String,
}

impl From<Author> for AuthorDto {
    fn from(a: Author) -> Self {
        Self {
            uid: a.uid,
            name: a.name,
            email: a.email,
            avatar: a.avatar,
        }
    }
}

/// Vote membership stays server-side; only the counts and the derived
/// popularity go over the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostDto {
    id: String,
    title: String,
    content: String,
    tag: String,
    author: AuthorDto,
    upvotes: usize,
    downvotes: usize,
    popularity: i64,
    created_at: DateTime<Utc>,
}

impl From<Post> for PostDto {
    fn from(p: Post) -> Self {
        let popularity = p.popularity();

        Self {
            id: p.id.to_string(),
            title: p.title,
            content: p.content,
            tag: p.tag,
            author: p.author.into(),
            upvotes: p.upvoters.len(),
            downvotes: p.downvoters.len(),
            popularity,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePostBody {
    title: Option<String>,
    content: Option<String>,
    tag: Option<String>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePostBody>,
) -> Result<(StatusCode, Json<PostDto>), ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;

    let post = state
        .handler
        .create_post(
            &claims,
            NewPostInput {
                title: body.title,
                content: body.content,
                tag: body.tag,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post.into())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedParams {
    page: Option<String>,
    limit: Option<String>,
    tag: Option<String>,
    sort_by_popularity: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedResponse {
    posts: Vec<PostDto>,
    total: u64,
    current_page: u64,
    total_pages: u64,
}

pub(crate) async fn feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, ApiError> {
    let page = state
        .handler
        .feed(FeedInput {
            page: num(&params.page),
            limit: num(&params.limit),
            tag: params.tag,
            sort_by_popularity: params.sort_by_popularity.as_deref() == Some("true"),
        })
        .await?;

    Ok(Json(FeedResponse {
        posts: page.posts.into_iter().map(PostDto::from).collect(),
        total: page.total,
        current_page: page.current_page,
        total_pages: page.total_pages,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorResponse {
    posts: Vec<PostDto>,
    total_posts: u64,
    current_page: u64,
    total_pages: u64,
    has_next_page: bool,
    has_prev_page: bool,
}

pub(crate) async fn by_author(
    State(state): State<AppState>,
    Path(author_id): Path<String>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<AuthorResponse>, ApiError> {
    authenticate(&*state.verifier, &headers).await?;

    let page = state
        .handler
        .posts_by_author(&author_id, num(&params.page), num(&params.limit))
        .await?;

    Ok(Json(AuthorResponse {
        posts: page.posts.into_iter().map(PostDto::from).collect(),
        total_posts: page.total_posts,
        current_page: page.current_page,
        total_pages: page.total_pages,
        has_next_page: page.has_next_page,
        has_prev_page: page.has_prev_page,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoteBody {
    /// upvote | downvote | -upvote | -downvote
    #[serde(rename = "type")]
    kind: Option<String>,
    // a body `email` may accompany the request; it is never trusted — the
    // voter identifier comes from the verified claims
}

pub(crate) async fn vote(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<VoteBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    let id = parse_id(&post_id, "postId")?;

    let op = state
        .handler
        .vote(id, claims.voter_id(), body.kind.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: format!("{} applied.", op.as_str()),
    }))
}

pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = authenticate(&*state.verifier, &headers).await?;
    let id = parse_id(&post_id, "postId")?;

    state.handler.delete_post(&claims, id).await?;

    Ok(Json(MessageResponse {
        message: "post deleted.".to_owned(),
    }))
}
