use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::error::AuthError;
use super::token::{Claims, Principal, TokenIssuer, TokenValidity};
use crate::config::OperatorCredentials;
use crate::db::models::TokenRecord;
use crate::db::TokenStore;

/// Operator login and app credential administration
///
/// App credentials must verify *and* still be present in the token store, so
/// deleting a record revokes the credential immediately.
pub struct TokenService {
    issuer: TokenIssuer,
    store: Arc<dyn TokenStore>,
    operator: OperatorCredentials,
}

impl TokenService {
    pub fn new(issuer: TokenIssuer, store: Arc<dyn TokenStore>, operator: OperatorCredentials) -> Self {
        Self {
            issuer,
            store,
            operator,
        }
    }

    /// Check operator credentials and issue a session credential
    pub fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if username != self.operator.username || password != self.operator.password {
            warn!("Failed login attempt for user '{}'", username);
            return Err(AuthError::BadCredentials);
        }

        info!("Operator '{}' logged in", username);
        self.issuer.issue_user(username)
    }

    pub fn authorize_session(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.issuer.verify(token)?;
        if claims.kind != Principal::User {
            return Err(AuthError::WrongPrincipal);
        }
        Ok(claims)
    }

    pub async fn authorize_app(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.issuer.verify(token)?;
        if claims.kind != Principal::App {
            return Err(AuthError::WrongPrincipal);
        }
        if !self.store.contains(token).await? {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Issue an app credential and record it so it can be listed and revoked
    pub async fn create_credential(
        &self,
        comment: &str,
        validity: TokenValidity,
    ) -> Result<TokenRecord, AuthError> {
        let comment = comment.trim();
        let issued_at = Utc::now();
        let token = self
            .issuer
            .issue_at(Principal::App, comment, validity.duration(), issued_at)?;
        let record = self.store.insert(comment, validity, &token, issued_at).await?;

        info!(
            "Created app credential id={} comment='{}' validity={:?}",
            record.id, record.comment, validity
        );
        Ok(record)
    }

    pub async fn revoke_credential(&self, id: i32) -> Result<(), AuthError> {
        if !self.store.delete(id).await? {
            return Err(AuthError::UnknownCredential(id));
        }
        info!("Revoked app credential id={}", id);
        Ok(())
    }

    pub async fn list_credentials(&self) -> Result<Vec<TokenRecord>, AuthError> {
        Ok(self.store.list().await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::db::memory::MemoryTokenStore;

    pub(crate) fn token_service() -> TokenService {
        TokenService::new(
            TokenIssuer::new(&Secret::new("test-secret")),
            Arc::new(MemoryTokenStore::default()),
            OperatorCredentials {
                username: "admin".into(),
                password: "hunter2".into(),
            },
        )
    }

    #[test]
    fn login_requires_both_fields() {
        let service = token_service();

        assert!(matches!(
            service.login("admin", "wrong"),
            Err(AuthError::BadCredentials)
        ));
        assert!(matches!(
            service.login("someone", "hunter2"),
            Err(AuthError::BadCredentials)
        ));

        let session = service.login("admin", "hunter2").unwrap();
        assert_eq!(service.authorize_session(&session).unwrap().sub, "admin");
    }

    #[tokio::test]
    async fn created_credential_authorizes_until_revoked() {
        let service = token_service();
        let record = service
            .create_credential("  nightly  ", TokenValidity::Week)
            .await
            .unwrap();
        assert_eq!(record.comment, "nightly");
        assert_eq!(record.validity(), TokenValidity::Week.duration());

        let claims = service.authorize_app(&record.token).await.unwrap();
        assert_eq!(claims.sub, "nightly");
        assert_eq!(claims.exp, record.expires_at().timestamp());

        service.revoke_credential(record.id).await.unwrap();
        assert!(matches!(
            service.authorize_app(&record.token).await,
            Err(AuthError::Revoked)
        ));
        assert!(matches!(
            service.revoke_credential(record.id).await,
            Err(AuthError::UnknownCredential(_))
        ));
    }

    #[tokio::test]
    async fn principals_are_not_interchangeable() {
        let service = token_service();
        let session = service.login("admin", "hunter2").unwrap();
        assert!(matches!(
            service.authorize_app(&session).await,
            Err(AuthError::WrongPrincipal)
        ));

        let record = service
            .create_credential("ci", TokenValidity::Day)
            .await
            .unwrap();
        assert!(matches!(
            service.authorize_session(&record.token),
            Err(AuthError::WrongPrincipal)
        ));
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let service = token_service();
        service.create_credential("first", TokenValidity::Day).await.unwrap();
        service.create_credential("second", TokenValidity::Month).await.unwrap();

        let records = service.list_credentials().await.unwrap();
        let comments: Vec<_> = records.iter().map(|r| r.comment.as_str()).collect();
        assert_eq!(comments, vec!["second", "first"]);
    }
}
