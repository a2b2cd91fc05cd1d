use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::entities::{Role, User};
use crate::errors::ApiError;
use crate::repositories::{RepositoryError, UserRepository};

/// Decoded identity of the requester. Produced per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

impl Claims {
    /// Set element used for vote membership: the verified email when the
    /// token carries one, the subject id otherwise. Never taken from a
    /// request body.
    pub fn voter_id(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.sub)
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> ::anyhow::Result<Claims>;
}

pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> ::anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;

        Ok(data.claims)
    }
}

/// First gate tier. The verifier is called exactly once; its failure detail
/// stays in the log.
pub(crate) async fn authenticate(
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
) -> Result<Claims, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    match verifier.verify(token).await {
        Ok(claims) => Ok(claims),
        Err(e) => {
            tracing::debug!(error = %e, "token verification failed");
            Err(ApiError::Forbidden("invalid credentials.".to_owned()))
        }
    }
}

/// Second gate tier: the claim's subject must resolve to a stored user with
/// the admin role. A subject with no user record cannot establish a role and
/// is rejected the same way.
pub(crate) async fn require_admin(
    users: &(dyn UserRepository + Send + Sync),
    claims: &Claims,
) -> Result<User, ApiError> {
    let user = match users.find(&claims.sub).await {
        Ok(u) => u,
        Err(RepositoryError::NotFound) => {
            return Err(ApiError::Forbidden("admin access required.".to_owned()))
        }
        Err(e) => return Err(e.into()),
    };

    if user.role != Role::Admin {
        return Err(ApiError::Forbidden("admin access required.".to_owned()));
    }

    Ok(user)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Verifier with a fixed token table, for tests.
    pub(crate) struct StaticVerifier(pub(crate) HashMap<String, Claims>);

    impl StaticVerifier {
        pub(crate) fn single(token: &str, claims: Claims) -> Self {
            Self(HashMap::from([(token.to_owned(), claims)]))
        }
    }

    #[async_trait]
    impl TokenVerifier for StaticVerifier {
        async fn verify(&self, token: &str) -> ::anyhow::Result<Claims> {
            self.0
                .get(token)
                .cloned()
                .ok_or_else(|| ::anyhow::anyhow!("unknown token"))
        }
    }

    pub(crate) fn claims(sub: &str, email: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_owned(),
            email: email.map(str::to_owned),
            name: None,
            exp: 4102444800, // 2100-01-01
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::testing::{claims, StaticVerifier};
    use super::*;
    use crate::entities::User;
    use crate::repositories::mock::InMemoryRepository;

    fn bearer(headers: &mut HeaderMap, token: &str) {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let verifier = StaticVerifier::single("t", claims("u1", None));
        let headers = HeaderMap::new();

        let res = authenticate(&verifier, &headers).await;
        assert!(matches!(res, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn wrong_scheme_is_unauthenticated() {
        let verifier = StaticVerifier::single("t", claims("u1", None));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));

        let res = authenticate(&verifier, &headers).await;
        assert!(matches!(res, Err(ApiError::Unauthenticated)));
    }

    #[tokio::test]
    async fn unverifiable_token_is_forbidden() {
        let verifier = StaticVerifier::single("t", claims("u1", None));
        let mut headers = HeaderMap::new();
        bearer(&mut headers, "someone-elses-token");

        let res = authenticate(&verifier, &headers).await;
        assert!(matches!(res, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn valid_token_yields_claims() {
        let verifier = StaticVerifier::single("t", claims("u1", Some("a@x.com")));
        let mut headers = HeaderMap::new();
        bearer(&mut headers, "t");

        let got = authenticate(&verifier, &headers).await.unwrap();
        assert_eq!(got.sub, "u1");
        assert_eq!(got.voter_id(), "a@x.com");
    }

    #[tokio::test]
    async fn jwt_verifier_round_trip() {
        let verifier = JwtVerifier::new("secret");
        let wanted = claims("u1", Some("a@x.com"));
        let token = encode(
            &Header::default(),
            &wanted,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let got = verifier.verify(&token).await.unwrap();
        assert_eq!(got.sub, wanted.sub);
        assert_eq!(got.email, wanted.email);

        let bad = verifier.verify("not-a-jwt").await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn require_admin_rejects_plain_users_and_ghosts() {
        let users = Arc::new(InMemoryRepository::<User>::new());
        let admin = crate::handlers::tests::user("root", Role::Admin);
        let plain = crate::handlers::tests::user("u1", Role::User);
        users.insert(admin).await.unwrap();
        users.insert(plain).await.unwrap();

        assert!(require_admin(&*users, &claims("root", None)).await.is_ok());
        assert!(matches!(
            require_admin(&*users, &claims("u1", None)).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            require_admin(&*users, &claims("nobody", None)).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
