use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::entities::{Author, Comment, Post, Report, ReportKind, ReportStatus, Role, User};
use crate::errors::ApiError;
use crate::repositories::{
    CommentRepository, FeedQuery, PostRepository, ReportRepository, RepositoryError,
    UserRepository, VoteOp,
};

const FEED_DEFAULT_LIMIT: u64 = 5;
const LISTING_DEFAULT_LIMIT: u64 = 10;

#[derive(Clone)]
pub struct Handler {
    pub user_repository: Arc<dyn UserRepository + Sync + Send>,
    pub post_repository: Arc<dyn PostRepository + Sync + Send>,
    pub comment_repository: Arc<dyn CommentRepository + Sync + Send>,
    pub report_repository: Arc<dyn ReportRepository + Sync + Send>,
}

#[derive(Debug, Default)]
pub struct NewUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Default)]
pub struct NewPostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default)]
pub struct NewCommentInput {
    pub post_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default)]
pub struct FileReportInput {
    pub comment_id: Option<String>,
    pub post_id: Option<String>,
    pub reason: Option<String>,
    pub snapshot: Option<String>,
}

#[derive(Debug, Default)]
pub struct FeedInput {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub tag: Option<String>,
    pub sort_by_popularity: bool,
}

#[derive(Debug)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub total: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

#[derive(Debug)]
pub struct AuthorPage {
    pub posts: Vec<Post>,
    pub total_posts: u64,
    pub current_page: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Debug)]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
    pub total_count: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

#[derive(Debug)]
pub struct ReportsPage {
    pub reports: Vec<Report>,
    pub total_reports: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

impl Handler {
    pub async fn create_user(&self, claims: &Claims, input: NewUserInput) -> Result<User, ApiError> {
        let name = required(input.name, "name and email are required.")?;
        let email = required(input.email, "name and email are required.")?;

        let new_user = User {
            uid: claims.sub.clone(),
            name,
            email,
            avatar: input.avatar.unwrap_or_default(),
            role: Role::User,
            badges: HashSet::from(["bronze".to_owned()]),
            joined_at: Utc::now(),
        };

        let can_insert = self.user_repository.insert(new_user.clone()).await?;

        if !can_insert {
            return Err(ApiError::Conflict("User already exists.".to_owned()));
        }

        Ok(new_user)
    }

    /// The only role transition there is: user -> admin.
    pub async fn promote_user(&self, uid: &str) -> Result<User, ApiError> {
        self.user_repository
            .update_role(uid, Role::Admin)
            .await
            .map_err(|e| repo_err(e, "user"))
    }

    pub async fn create_post(&self, claims: &Claims, input: NewPostInput) -> Result<Post, ApiError> {
        let title = required(input.title, "title, content, and tag are required.")?;
        let content = required(input.content, "title, content, and tag are required.")?;
        let tag = required(input.tag, "title, content, and tag are required.")?;

        let author_user = match self.user_repository.find(&claims.sub).await {
            Ok(u) => u,
            Err(RepositoryError::NotFound) => {
                return Err(ApiError::NotFound(
                    "cannot find user. not registered?".to_owned(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        let new_post = Post {
            id: Uuid::new_v4(),
            title,
            content,
            tag,
            author: Author::from(&author_user),
            upvoters: HashSet::new(),
            downvoters: HashSet::new(),
            created_at: Utc::now(),
        };

        let can_insert = self.post_repository.insert(new_post.clone()).await?;

        if !can_insert {
            return Err(ApiError::Internal(anyhow::anyhow!("post id duplicated")));
        }

        Ok(new_post)
    }

    /// Owner or admin only. Popularity is derived per query, so deletion
    /// leaves nothing cached to invalidate.
    pub async fn delete_post(&self, claims: &Claims, post_id: Uuid) -> Result<(), ApiError> {
        let post = self
            .post_repository
            .find(post_id)
            .await
            .map_err(|e| repo_err(e, "post"))?;

        if post.author.uid != claims.sub {
            auth::require_admin(&*self.user_repository, claims).await?;
        }

        self.post_repository
            .delete(post_id)
            .await
            .map_err(|e| repo_err(e, "post"))
    }

    /// One atomic set update per call; repeating an operation is a no-op.
    pub async fn vote(
        &self,
        post_id: Uuid,
        voter: &str,
        op_raw: Option<&str>,
    ) -> Result<VoteOp, ApiError> {
        let op = op_raw
            .and_then(|s| s.parse::<VoteOp>().ok())
            .ok_or_else(|| {
                ApiError::InvalidArgument(
                    "type must be one of upvote, downvote, -upvote, -downvote.".to_owned(),
                )
            })?;

        self.post_repository
            .apply_vote(post_id, voter, op)
            .await
            .map_err(|e| repo_err(e, "post"))?;

        Ok(op)
    }

    pub async fn feed(&self, input: FeedInput) -> Result<FeedPage, ApiError> {
        let page = input.page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = input.limit.filter(|l| *l >= 1).unwrap_or(FEED_DEFAULT_LIMIT);

        let posts = self
            .post_repository
            .find_page(FeedQuery {
                tag: input.tag.clone(),
                sort_by_popularity: input.sort_by_popularity,
                skip: (page - 1) * limit,
                limit,
            })
            .await?;

        let total = self.post_repository.count(input.tag.as_deref()).await?;

        Ok(FeedPage {
            posts,
            total,
            current_page: page,
            total_pages: total_pages(total, limit),
        })
    }

    pub async fn posts_by_author(
        &self,
        author_uid: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<AuthorPage, ApiError> {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit.filter(|l| *l >= 1).unwrap_or(LISTING_DEFAULT_LIMIT);

        let posts = self
            .post_repository
            .find_by_author(author_uid, (page - 1) * limit, limit)
            .await?;

        let total_posts = self.post_repository.count_by_author(author_uid).await?;
        let total_pages = total_pages(total_posts, limit);

        Ok(AuthorPage {
            posts,
            total_posts,
            current_page: page,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        })
    }

    pub async fn create_comment(
        &self,
        claims: &Claims,
        input: NewCommentInput,
    ) -> Result<Comment, ApiError> {
        let post_id_raw = required(input.post_id, "postId and content are required.")?;
        let content = required(input.content, "postId and content are required.")?;
        let post_id = parse_id(&post_id_raw, "postId")?;

        let author_user = match self.user_repository.find(&claims.sub).await {
            Ok(u) => u,
            Err(RepositoryError::NotFound) => {
                return Err(ApiError::NotFound(
                    "cannot find user. not registered?".to_owned(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        self.post_repository
            .find(post_id)
            .await
            .map_err(|e| repo_err(e, "post"))?;

        let now = Utc::now();
        let new_comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author: Author::from(&author_user),
            content,
            upvoters: HashSet::new(),
            downvoters: HashSet::new(),
            created_at: now,
            updated_at: now,
        };

        let can_insert = self.comment_repository.insert(new_comment.clone()).await?;

        if !can_insert {
            return Err(ApiError::Internal(anyhow::anyhow!("comment id duplicated")));
        }

        Ok(new_comment)
    }

    pub async fn comments_by_post(
        &self,
        post_id: Uuid,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Result<CommentsPage, ApiError> {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit.filter(|l| *l >= 1).unwrap_or(LISTING_DEFAULT_LIMIT);

        let comments = self
            .comment_repository
            .find_by_post(post_id, (page - 1) * limit, limit)
            .await?;

        let total_count = self.comment_repository.count_by_post(post_id).await?;

        Ok(CommentsPage {
            comments,
            total_count,
            current_page: page,
            total_pages: total_pages(total_count, limit),
        })
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<(), ApiError> {
        self.comment_repository
            .delete(comment_id)
            .await
            .map_err(|e| repo_err(e, "comment"))
    }

    /// The reported content is copied by value into the report, so later
    /// deletion of the comment cannot corrupt the audit trail.
    pub async fn file_report(
        &self,
        claims: &Claims,
        input: FileReportInput,
    ) -> Result<Report, ApiError> {
        const MSG: &str = "commentId, postId, reason, and commentContent are required.";

        let comment_id_raw = required(input.comment_id, MSG)?;
        let post_id_raw = required(input.post_id, MSG)?;
        let reason = required(input.reason, MSG)?;
        let snapshot = required(input.snapshot, MSG)?;

        let new_report = Report {
            id: Uuid::new_v4(),
            kind: ReportKind::Comment,
            comment_id: parse_id(&comment_id_raw, "commentId")?,
            post_id: parse_id(&post_id_raw, "postId")?,
            reported_by: claims.sub.clone(),
            reason,
            snapshot,
            status: ReportStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        };

        let can_insert = self.report_repository.insert(new_report.clone()).await?;

        if !can_insert {
            return Err(ApiError::Internal(anyhow::anyhow!("report id duplicated")));
        }

        Ok(new_report)
    }

    pub async fn list_reports(
        &self,
        page: Option<u64>,
        limit: Option<u64>,
        status_raw: Option<&str>,
    ) -> Result<ReportsPage, ApiError> {
        let status = match status_raw {
            None | Some("all") => None,
            Some(s) => Some(s.parse::<ReportStatus>().map_err(|_| {
                ApiError::InvalidArgument(
                    "status must be one of pending, resolved, dismissed, or all.".to_owned(),
                )
            })?),
        };

        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit.filter(|l| *l >= 1).unwrap_or(LISTING_DEFAULT_LIMIT);

        let reports = self
            .report_repository
            .find_page(status, (page - 1) * limit, limit)
            .await?;

        // scoped to the same filter as the page itself
        let total_reports = self.report_repository.count(status).await?;

        Ok(ReportsPage {
            reports,
            total_reports,
            total_pages: total_pages(total_reports, limit),
            current_page: page,
        })
    }

    pub async fn set_report_status(
        &self,
        report_id: Uuid,
        status_raw: Option<&str>,
    ) -> Result<ReportStatus, ApiError> {
        let status = status_raw
            .and_then(|s| s.parse::<ReportStatus>().ok())
            .ok_or_else(|| {
                ApiError::InvalidArgument(
                    "status must be one of pending, resolved, dismissed.".to_owned(),
                )
            })?;

        self.report_repository
            .set_status(report_id, status, Utc::now())
            .await
            .map_err(|e| repo_err(e, "report"))?;

        Ok(status)
    }

    pub async fn delete_report(&self, report_id: Uuid) -> Result<(), ApiError> {
        self.report_repository
            .delete(report_id)
            .await
            .map_err(|e| repo_err(e, "report"))
    }
}

fn required(field: Option<String>, msg: &str) -> Result<String, ApiError> {
    match field {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ApiError::InvalidArgument(msg.to_owned())),
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidArgument(format!("{} must be a valid id.", what)))
}

fn repo_err(e: RepositoryError, what: &str) -> ApiError {
    match e {
        RepositoryError::NotFound => ApiError::NotFound(format!("cannot find {}.", what)),
        e => e.into(),
    }
}

fn total_pages(total: u64, limit: u64) -> u64 {
    (total + limit - 1) / limit
}
