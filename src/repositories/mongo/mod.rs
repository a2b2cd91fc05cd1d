use std::collections::HashSet;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    CommentRepository, FeedQuery, PostRepository, ReportRepository, RepositoryError, Result,
    UserRepository, VoteOp,
};
use crate::entities::{Comment, Post, Report, ReportKind, ReportStatus, Role, User};

mod type_convert;

pub struct MongoUserRepository {
    coll: Collection<MongoUserModel>,
}

impl MongoUserRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        db.run_command(
            doc! {
                "createIndexes": "users",
                "indexes": [{
                    "name": "unique_uid",
                    "key": {
                        "uid": 1
                    },
                    "unique": true
                }],
            },
            None,
        )
        .await
        .map_err(::anyhow::Error::new)?;

        Ok(Self {
            coll: db.collection("users"),
        })
    }
}

pub struct MongoPostRepository {
    coll: Collection<MongoPostModel>,
}

impl MongoPostRepository {
    pub fn new_with(db: &Database) -> Self {
        Self {
            coll: db.collection("posts"),
        }
    }
}

pub struct MongoCommentRepository {
    coll: Collection<MongoCommentModel>,
}

impl MongoCommentRepository {
    pub fn new_with(db: &Database) -> Self {
        Self {
            coll: db.collection("comments"),
        }
    }
}

pub struct MongoReportRepository {
    coll: Collection<MongoReportModel>,
}

impl MongoReportRepository {
    pub fn new_with(db: &Database) -> Self {
        Self {
            coll: db.collection("reports"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoUserModel {
    uid: String,
    name: String,
    email: String,
    avatar: String,
    role: Role,
    badges: HashSet<String>,
    joined_at: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoAuthorModel {
    uid: String,
    name: String,
    email: String,
    avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoPostModel {
    id: String,
    title: String,
    content: String,
    tag: String,
    author: MongoAuthorModel,
    upvoters: HashSet<String>,
    downvoters: HashSet<String>,
    created_at: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoCommentModel {
    id: String,
    post_id: String,
    author: MongoAuthorModel,
    content: String,
    upvoters: HashSet<String>,
    downvoters: HashSet<String>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoReportModel {
    id: String,
    kind: ReportKind,
    comment_id: String,
    post_id: String,
    reported_by: String,
    reason: String,
    snapshot: String,
    status: ReportStatus,
    created_at: bson::DateTime,
    updated_at: Option<bson::DateTime>,
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, item: User) -> Result<bool> {
        let model: MongoUserModel = item.into();

        unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, uid: &str) -> Result<User> {
        let user: User = self
            .coll
            .find_one(doc! { "uid": uid }, None)
            .await
            .cvt()?
            .found()?
            .into();
        assert_eq!(user.uid, uid, "not matched uid!");

        Ok(user)
    }

    async fn update_role(&self, uid: &str, role: Role) -> Result<User> {
        let res = self
            .coll
            .update_one(
                doc! { "uid": uid },
                doc! { "$set": { "role": role.as_str() } },
                None,
            )
            .await
            .cvt()?;

        if res.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.find(uid).await
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn insert(&self, item: Post) -> Result<bool> {
        let model: MongoPostModel = item.into();

        unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Post> {
        let post: Post = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await
            .cvt()?
            .found()?
            .into();

        Ok(post)
    }

    async fn apply_vote(&self, id: Uuid, voter: &str, op: VoteOp) -> Result<()> {
        // one update document per operation: membership in the opposite set
        // is revoked in the same atomic write that grants the new one
        let update = match op {
            VoteOp::Up => doc! {
                "$addToSet": { "upvoters": voter },
                "$pull": { "downvoters": voter }
            },
            VoteOp::Down => doc! {
                "$addToSet": { "downvoters": voter },
                "$pull": { "upvoters": voter }
            },
            VoteOp::RemoveUp => doc! { "$pull": { "upvoters": voter } },
            VoteOp::RemoveDown => doc! { "$pull": { "downvoters": voter } },
        };

        let res = self
            .coll
            .update_one(doc! { "id": id.to_string() }, update, None)
            .await
            .cvt()?;

        if res.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn find_page(&self, query: FeedQuery) -> Result<Vec<Post>> {
        let mut pipeline = Vec::new();

        if let Some(tag) = &query.tag {
            pipeline.push(doc! { "$match": { "tag": tag_filter(tag) } });
        }

        if query.sort_by_popularity {
            pipeline.push(doc! {
                "$addFields": {
                    "popularity": {
                        "$subtract": [{ "$size": "$upvoters" }, { "$size": "$downvoters" }]
                    }
                }
            });
            pipeline.push(doc! { "$sort": { "popularity": -1, "created_at": -1 } });
        } else {
            pipeline.push(doc! { "$sort": { "created_at": -1 } });
        }

        pipeline.push(doc! { "$skip": query.skip as i64 });
        pipeline.push(doc! { "$limit": query.limit as i64 });

        let docs = self
            .coll
            .aggregate(pipeline, None)
            .await
            .cvt()?
            .try_collect::<Vec<Document>>()
            .await
            .cvt()?;

        docs.into_iter()
            .map(|d| {
                bson::from_document::<MongoPostModel>(d)
                    .map(Post::from)
                    .cvt()
            })
            .collect()
    }

    async fn count(&self, tag: Option<&str>) -> Result<u64> {
        let filter = match tag {
            Some(t) => doc! { "tag": tag_filter(t) },
            None => doc! {},
        };

        self.coll.count_documents(filter, None).await.cvt()
    }

    async fn find_by_author(&self, author_uid: &str, skip: u64, limit: u64) -> Result<Vec<Post>> {
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit as i64)
            .build();

        let models = self
            .coll
            .find(doc! { "author.uid": author_uid }, opts)
            .await
            .cvt()?
            .try_collect::<Vec<_>>()
            .await
            .cvt()?;

        Ok(models.into_iter().map(Post::from).collect())
    }

    async fn count_by_author(&self, author_uid: &str) -> Result<u64> {
        self.coll
            .count_documents(doc! { "author.uid": author_uid }, None)
            .await
            .cvt()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let res = self
            .coll
            .delete_one(doc! { "id": id.to_string() }, None)
            .await
            .cvt()?;

        if res.deleted_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MongoCommentRepository {
    async fn insert(&self, item: Comment) -> Result<bool> {
        let model: MongoCommentModel = item.into();

        unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find_by_post(&self, post_id: Uuid, skip: u64, limit: u64) -> Result<Vec<Comment>> {
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit as i64)
            .build();

        let models = self
            .coll
            .find(doc! { "post_id": post_id.to_string() }, opts)
            .await
            .cvt()?
            .try_collect::<Vec<_>>()
            .await
            .cvt()?;

        Ok(models.into_iter().map(Comment::from).collect())
    }

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64> {
        self.coll
            .count_documents(doc! { "post_id": post_id.to_string() }, None)
            .await
            .cvt()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let res = self
            .coll
            .delete_one(doc! { "id": id.to_string() }, None)
            .await
            .cvt()?;

        if res.deleted_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[async_trait]
impl ReportRepository for MongoReportRepository {
    async fn insert(&self, item: Report) -> Result<bool> {
        let model: MongoReportModel = item.into();

        unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find_page(
        &self,
        status: Option<ReportStatus>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Report>> {
        let filter = match status {
            Some(s) => doc! { "status": s.as_str() },
            None => doc! {},
        };

        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit as i64)
            .build();

        let models = self
            .coll
            .find(filter, opts)
            .await
            .cvt()?
            .try_collect::<Vec<_>>()
            .await
            .cvt()?;

        Ok(models.into_iter().map(Report::from).collect())
    }

    async fn count(&self, status: Option<ReportStatus>) -> Result<u64> {
        let filter = match status {
            Some(s) => doc! { "status": s.as_str() },
            None => doc! {},
        };

        self.coll.count_documents(filter, None).await.cvt()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$set": {
                    "status": status.as_str(),
                    "updated_at": bson::DateTime::from_chrono(updated_at)
                } },
                None,
            )
            .await
            .cvt()?;

        if res.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let res = self
            .coll
            .delete_one(doc! { "id": id.to_string() }, None)
            .await
            .cvt()?;

        if res.deleted_count == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

/// Anchored case-insensitive exact match for a tag value.
fn tag_filter(tag: &str) -> Document {
    doc! { "$regex": format!("^{}$", regex::escape(tag)), "$options": "i" }
}

trait Cvt<T> {
    fn cvt(self) -> Result<T>;
}
impl<T, E: Sync + Send + ::std::error::Error + 'static> Cvt<T> for ::std::result::Result<T, E> {
    fn cvt(self) -> Result<T> {
        self.map_err(|e| RepositoryError::Internal(anyhow!(e)))
    }
}

trait Found<T> {
    fn found(self) -> Result<T>;
}
impl<T> Found<T> for Option<T> {
    fn found(self) -> Result<T> {
        match self {
            Some(o) => Ok(o),
            None => Err(RepositoryError::NotFound),
        }
    }
}

fn unique_check<T>(result: ::mongodb::error::Result<T>) -> Result<bool> {
    let e = match result {
        Ok(_) => return Ok(true),
        Err(e) => e,
    };

    match *e.kind.clone() {
        ::mongodb::error::ErrorKind::Write(::mongodb::error::WriteFailure::WriteError(we))
            if we.code == 11000 =>
        {
            Ok(false)
        }
        _ => Err(RepositoryError::Internal(anyhow!(e))),
    }
}
