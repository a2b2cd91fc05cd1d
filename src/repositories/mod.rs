use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{Comment, Post, Report, ReportStatus, Role, User};

pub(crate) mod mock;
pub(crate) mod mongo;

type Result<T> = ::std::result::Result<T, RepositoryError>;

#[async_trait]
pub(crate) trait UserRepository {
    /// `Ok(false)` means the uid is already taken.
    async fn insert(&self, item: User) -> Result<bool>;

    async fn find(&self, uid: &str) -> Result<User>;

    async fn update_role(&self, uid: &str, role: Role) -> Result<User>;
}

#[async_trait]
pub(crate) trait PostRepository {
    async fn insert(&self, item: Post) -> Result<bool>;

    async fn find(&self, id: Uuid) -> Result<Post>;

    /// Applies one vote operation as a single atomic document update.
    /// `upvote`/`downvote` add to one set and pull from the other in the
    /// same update; the remove operations only pull from their own set.
    async fn apply_vote(&self, id: Uuid, voter: &str, op: VoteOp) -> Result<()>;

    async fn find_page(&self, query: FeedQuery) -> Result<Vec<Post>>;

    /// Count of posts matching the tag filter (all posts when `None`).
    async fn count(&self, tag: Option<&str>) -> Result<u64>;

    async fn find_by_author(&self, author_uid: &str, skip: u64, limit: u64) -> Result<Vec<Post>>;

    async fn count_by_author(&self, author_uid: &str) -> Result<u64>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub(crate) trait CommentRepository {
    async fn insert(&self, item: Comment) -> Result<bool>;

    async fn find_by_post(&self, post_id: Uuid, skip: u64, limit: u64) -> Result<Vec<Comment>>;

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub(crate) trait ReportRepository {
    async fn insert(&self, item: Report) -> Result<bool>;

    async fn find_page(
        &self,
        status: Option<ReportStatus>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Report>>;

    async fn count(&self, status: Option<ReportStatus>) -> Result<u64>;

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VoteOp {
    Up,
    Down,
    RemoveUp,
    RemoveDown,
}

impl VoteOp {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            VoteOp::Up => "upvote",
            VoteOp::Down => "downvote",
            VoteOp::RemoveUp => "-upvote",
            VoteOp::RemoveDown => "-downvote",
        }
    }
}

impl FromStr for VoteOp {
    type Err = ();

    fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
        match s {
            "upvote" => Ok(VoteOp::Up),
            "downvote" => Ok(VoteOp::Down),
            "-upvote" => Ok(VoteOp::RemoveUp),
            "-downvote" => Ok(VoteOp::RemoveDown),
            _ => Err(()),
        }
    }
}

/// Page selection for the public feed. `tag` is a case-insensitive exact
/// match. Ordering is `created_at desc`, preceded by the derived popularity
/// when `sort_by_popularity` is set; posts sharing both popularity and
/// `created_at` have no further defined order.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeedQuery {
    pub(crate) tag: Option<String>,
    pub(crate) sort_by_popularity: bool,
    pub(crate) skip: u64,
    pub(crate) limit: u64,
}

#[derive(Debug)]
pub(crate) enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}
