use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    CommentRepository, FeedQuery, PostRepository, ReportRepository, RepositoryError, Result,
    UserRepository, VoteOp,
};
use crate::entities::{Comment, Post, Report, ReportStatus, Role, User};

pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self(Mutex::new(vec![]))
    }
}
impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn find_mut<T, P>(v: &mut Vec<T>, predicate: P) -> Result<&mut T>
where
    P: FnMut(&&mut T) -> bool,
{
    let mut res = v.iter_mut().filter(predicate).collect::<Vec<_>>();

    match res.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(res.remove(0)),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[inline]
fn find_ref<T, P>(v: &[T], predicate: P) -> Result<&T>
where
    P: FnMut(&&T) -> bool,
{
    let mut res = v.iter().filter(predicate).collect::<Vec<_>>();

    match res.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(res.remove(0)),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[inline]
fn remove_one<T, P>(v: &mut Vec<T>, predicate: P) -> Result<T>
where
    P: Fn(&T) -> bool,
{
    let mut indexes = v
        .iter()
        .enumerate()
        .filter(|(_, t)| predicate(t))
        .map(|(i, _)| i)
        .collect::<Vec<_>>();

    match indexes.len() {
        0 => Err(RepositoryError::NotFound),
        1 => Ok(v.remove(indexes.remove(0))),
        i => Err(RepositoryError::NoUnique { matched: i as u32 }),
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository<User> {
    async fn insert(&self, item: User) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.uid == item.uid) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, uid: &str) -> Result<User> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.uid == uid)?.clone())
    }

    async fn update_role(&self, uid: &str, role: Role) -> Result<User> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.uid == uid)?;

        item.role = role;

        Ok(item.clone())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository<Post> {
    async fn insert(&self, item: Post) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Post> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn apply_vote(&self, id: Uuid, voter: &str, op: VoteOp) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        match op {
            VoteOp::Up => {
                item.upvoters.insert(voter.to_owned());
                item.downvoters.remove(voter);
            }
            VoteOp::Down => {
                item.downvoters.insert(voter.to_owned());
                item.upvoters.remove(voter);
            }
            VoteOp::RemoveUp => {
                item.upvoters.remove(voter);
            }
            VoteOp::RemoveDown => {
                item.downvoters.remove(voter);
            }
        }

        Ok(())
    }

    async fn find_page(
        &self,
        FeedQuery {
            tag,
            sort_by_popularity,
            skip,
            limit,
        }: FeedQuery,
    ) -> Result<Vec<Post>> {
        let guard = self.0.lock().await;

        let mut matched = guard
            .iter()
            .filter(|p| {
                tag.as_ref()
                    .map(|t| p.tag.eq_ignore_ascii_case(t))
                    .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();

        if sort_by_popularity {
            matched.sort_by(|a, b| {
                b.popularity()
                    .cmp(&a.popularity())
                    .then(b.created_at.cmp(&a.created_at))
            });
        } else {
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, tag: Option<&str>) -> Result<u64> {
        let guard = self.0.lock().await;

        Ok(guard
            .iter()
            .filter(|p| tag.map(|t| p.tag.eq_ignore_ascii_case(t)).unwrap_or(true))
            .count() as u64)
    }

    async fn find_by_author(&self, author_uid: &str, skip: u64, limit: u64) -> Result<Vec<Post>> {
        let guard = self.0.lock().await;

        let mut matched = guard
            .iter()
            .filter(|p| p.author.uid == author_uid)
            .cloned()
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_author(&self, author_uid: &str) -> Result<u64> {
        let guard = self.0.lock().await;

        Ok(guard.iter().filter(|p| p.author.uid == author_uid).count() as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.id == id).map(|_| ())
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository<Comment> {
    async fn insert(&self, item: Comment) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find_by_post(&self, post_id: Uuid, skip: u64, limit: u64) -> Result<Vec<Comment>> {
        let guard = self.0.lock().await;

        let mut matched = guard
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_post(&self, post_id: Uuid) -> Result<u64> {
        let guard = self.0.lock().await;

        Ok(guard.iter().filter(|c| c.post_id == post_id).count() as u64)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.id == id).map(|_| ())
    }
}

#[async_trait]
impl ReportRepository for InMemoryRepository<Report> {
    async fn insert(&self, item: Report) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find_page(
        &self,
        status: Option<ReportStatus>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Report>> {
        let guard = self.0.lock().await;

        let mut matched = guard
            .iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect::<Vec<_>>();

        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, status: Option<ReportStatus>) -> Result<u64> {
        let guard = self.0.lock().await;

        Ok(guard
            .iter()
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .count() as u64)
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: ReportStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.status = status;
        item.updated_at = Some(updated_at);

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;

        remove_one(&mut guard, |v| v.id == id).map(|_| ())
    }
}
