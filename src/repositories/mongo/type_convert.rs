use mongodb::bson;

use super::{
    MongoAuthorModel, MongoCommentModel, MongoPostModel, MongoReportModel, MongoUserModel,
};
use crate::entities::{Author, Comment, Post, Report, User};

impl From<MongoUserModel> for User {
    fn from(
        MongoUserModel {
            uid,
            name,
            email,
            avatar,
            role,
            badges,
            joined_at,
        }: MongoUserModel,
    ) -> Self {
        User {
            uid,
            name,
            email,
            avatar,
            role,
            badges,
            joined_at: joined_at.to_chrono(),
        }
    }
}
impl From<User> for MongoUserModel {
    fn from(
        User {
            uid,
            name,
            email,
            avatar,
            role,
            badges,
            joined_at,
        }: User,
    ) -> Self {
        MongoUserModel {
            uid,
            name,
            email,
            avatar,
            role,
            badges,
            joined_at: bson::DateTime::from_chrono(joined_at),
        }
    }
}

impl From<MongoAuthorModel> for Author {
    fn from(
        MongoAuthorModel {
            uid,
            name,
            email,
            avatar,
        }: MongoAuthorModel,
    ) -> Self {
        Author {
            uid,
            name,
            email,
            avatar,
        }
    }
}
impl From<Author> for MongoAuthorModel {
    fn from(
        Author {
            uid,
            name,
            email,
            avatar,
        }: Author,
    ) -> Self {
        MongoAuthorModel {
            uid,
            name,
            email,
            avatar,
        }
    }
}

impl From<MongoPostModel> for Post {
    fn from(
        MongoPostModel {
            id,
            title,
            content,
            tag,
            author,
            upvoters,
            downvoters,
            created_at,
        }: MongoPostModel,
    ) -> Self {
        Post {
            id: id.parse().unwrap(),
            title,
            content,
            tag,
            author: author.into(),
            upvoters,
            downvoters,
            created_at: created_at.to_chrono(),
        }
    }
}
impl From<Post> for MongoPostModel {
    fn from(
        Post {
            id,
            title,
            content,
            tag,
            author,
            upvoters,
            downvoters,
            created_at,
        }: Post,
    ) -> Self {
        MongoPostModel {
            id: id.to_string(),
            title,
            content,
            tag,
            author: author.into(),
            upvoters,
            downvoters,
            created_at: bson::DateTime::from_chrono(created_at),
        }
    }
}

impl From<MongoCommentModel> for Comment {
    fn from(
        MongoCommentModel {
            id,
            post_id,
            author,
            content,
            upvoters,
            downvoters,
            created_at,
            updated_at,
        }: MongoCommentModel,
    ) -> Self {
        Comment {
            id: id.parse().unwrap(),
            post_id: post_id.parse().unwrap(),
            author: author.into(),
            content,
            upvoters,
            downvoters,
            created_at: created_at.to_chrono(),
            updated_at: updated_at.to_chrono(),
        }
    }
}
impl From<Comment> for MongoCommentModel {
    fn from(
        Comment {
            id,
            post_id,
            author,
            content,
            upvoters,
            downvoters,
            created_at,
            updated_at,
        }: Comment,
    ) -> Self {
        MongoCommentModel {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author: author.into(),
            content,
            upvoters,
            downvoters,
            created_at: bson::DateTime::from_chrono(created_at),
            updated_at: bson::DateTime::from_chrono(updated_at),
        }
    }
}

impl From<MongoReportModel> for Report {
    fn from(
        MongoReportModel {
            id,
            kind,
            comment_id,
            post_id,
            reported_by,
            reason,
            snapshot,
            status,
            created_at,
            updated_at,
        }: MongoReportModel,
    ) -> Self {
        Report {
            id: id.parse().unwrap(),
            kind,
            comment_id: comment_id.parse().unwrap(),
            post_id: post_id.parse().unwrap(),
            reported_by,
            reason,
            snapshot,
            status,
            created_at: created_at.to_chrono(),
            updated_at: updated_at.map(|d| d.to_chrono()),
        }
    }
}
impl From<Report> for MongoReportModel {
    fn from(
        Report {
            id,
            kind,
            comment_id,
            post_id,
            reported_by,
            reason,
            snapshot,
            status,
            created_at,
            updated_at,
        }: Report,
    ) -> Self {
        MongoReportModel {
            id: id.to_string(),
            kind,
            comment_id: comment_id.to_string(),
            post_id: post_id.to_string(),
            reported_by,
            reason,
            snapshot,
            status,
            created_at: bson::DateTime::from_chrono(created_at),
            updated_at: updated_at.map(bson::DateTime::from_chrono),
        }
    }
}
