use std::sync::Arc;

use axum::Router;

use crate::auth::{JwtVerifier, TokenVerifier};
use crate::controllers::{router, AppState};
use crate::entities::{Comment, Post, Report, User};
use crate::handlers::Handler;
use crate::repositories::mock::InMemoryRepository;
use crate::repositories::mongo::{
    MongoCommentRepository, MongoPostRepository, MongoReportRepository, MongoUserRepository,
};

/// Everything lives in process memory; state is gone on shutdown. Handy for
/// local runs and tests.
pub fn in_memory(verifier: Arc<dyn TokenVerifier>) -> Router {
    router(AppState {
        handler: Handler {
            user_repository: Arc::new(InMemoryRepository::<User>::new()),
            post_repository: Arc::new(InMemoryRepository::<Post>::new()),
            comment_repository: Arc::new(InMemoryRepository::<Comment>::new()),
            report_repository: Arc::new(InMemoryRepository::<Report>::new()),
        },
        verifier,
    })
}

pub async fn mongo(
    uri_str: impl AsRef<str>,
    db_name: impl AsRef<str>,
    jwt_secret: &str,
) -> ::anyhow::Result<Router> {
    let c = ::mongodb::Client::with_uri_str(uri_str).await?;
    let db = c.database(db_name.as_ref());

    Ok(router(AppState {
        handler: Handler {
            user_repository: Arc::new(MongoUserRepository::new_with(&db).await?),
            post_repository: Arc::new(MongoPostRepository::new_with(&db)),
            comment_repository: Arc::new(MongoCommentRepository::new_with(&db)),
            report_repository: Arc::new(MongoReportRepository::new_with(&db)),
        },
        verifier: Arc::new(JwtVerifier::new(jwt_secret)),
    }))
}
