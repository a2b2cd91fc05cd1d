use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    pub badges: HashSet<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Denormalized author fields carried on posts and comments so listings
/// don't need a `users` lookup per document.
#[derive(Debug, Clone)]
pub struct Author {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tag: String,
    pub author: Author,
    pub upvoters: HashSet<String>,
    pub downvoters: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Derived, never persisted.
    pub fn popularity(&self) -> i64 {
        self.upvoters.len() as i64 - self.downvoters.len() as i64
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: Author,
    pub content: String,
    // reserved: no toggle endpoint exercises these yet
    pub upvoters: HashSet<String>,
    pub downvoters: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub id: Uuid,
    pub kind: ReportKind,
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub reported_by: String,
    pub reason: String,
    /// Copy of the reported content taken at filing time; survives deletion
    /// of the comment it was taken from.
    pub snapshot: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(()),
        }
    }
}
