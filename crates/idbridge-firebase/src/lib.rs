// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Firebase Authentication backend for idbridge.
//!
//! Implements [`IdentityBackend`] over the Identity Toolkit v1 REST API.
//! Accounts are managed through the admin `accounts` endpoints and ID tokens
//! are checked server-side with `accounts:lookup`.

pub mod client;
pub mod credentials;
mod errors;
mod jwt;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use idbridge_config::model::FirebaseConfig;
use idbridge_core::{
    Claims, HealthStatus, IdentityBackend, IdentityError, Patch, PluginAdapter, Token, UserRecord,
};
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

pub use client::FirebaseClient;
pub use credentials::{AccessTokenSource, StaticAccessToken};

use crate::errors::Subject;
use crate::jwt::IdTokenPayload;
use crate::types::{
    DeleteRequest, LookupRequest, LookupResponse, SignUpRequest, SignUpResponse, UpdateRequest,
};

/// Identity backend bound to one Firebase project.
#[derive(Debug, Clone)]
pub struct FirebaseBackend {
    client: FirebaseClient,
}

impl FirebaseBackend {
    /// Builds the backend. Fails with `Init` when the project id is missing
    /// or the HTTP client cannot be constructed.
    pub fn connect(
        config: &FirebaseConfig,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, IdentityError> {
        let client = FirebaseClient::new(config, tokens)?;
        info!(
            project_id = client.project_id(),
            api_base_url = %config.api_base_url,
            "firebase backend ready"
        );
        Ok(Self { client })
    }

    async fn lookup(
        &self,
        request: &LookupRequest,
        subject: Subject<'_>,
    ) -> Result<UserRecord, IdentityError> {
        let response: LookupResponse = self
            .client
            .post("accounts:lookup", request)
            .await
            .map_err(|f| f.into_identity(subject))?;
        match response.users.into_iter().next() {
            Some(account) => account.into_record(),
            None => Err(subject.not_found()),
        }
    }

    async fn lookup_uid(&self, uid: &str) -> Result<UserRecord, IdentityError> {
        let request = LookupRequest {
            local_id: vec![uid.to_owned()],
            ..LookupRequest::default()
        };
        self.lookup(&request, Subject::Uid(uid)).await
    }
}

/// The record a successful sign-up implies when it cannot be read back.
fn record_from_patch(uid: String, patch: &Patch) -> UserRecord {
    let mut record = UserRecord::new(uid);
    record.email = patch.email.clone();
    record.email_verified = patch.email_verified.unwrap_or_default();
    record.phone_number = patch.phone_number.clone();
    record.display_name = patch.display_name.clone();
    record.photo_url = patch.photo_url.clone();
    record.disabled = patch.disabled.unwrap_or_default();
    record
}

fn note_unsupported(patch: &Patch) {
    if patch.whatsapp_number.is_some() {
        debug!("whatsapp_number has no firebase field, dropping it");
    }
}

#[async_trait]
impl PluginAdapter for FirebaseBackend {
    fn name(&self) -> &str {
        "firebase"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, IdentityError> {
        match self.client.tokens().access_token().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "cannot obtain access token: {e}"
            ))),
        }
    }
}

#[async_trait]
impl IdentityBackend for FirebaseBackend {
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, IdentityError> {
        let request = LookupRequest {
            email: vec![email.to_owned()],
            ..LookupRequest::default()
        };
        self.lookup(&request, Subject::Email(email)).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<UserRecord, IdentityError> {
        let request = LookupRequest {
            phone_number: vec![phone.to_owned()],
            ..LookupRequest::default()
        };
        self.lookup(&request, Subject::Phone(phone)).await
    }

    async fn create(&self, patch: &Patch) -> Result<UserRecord, IdentityError> {
        note_unsupported(patch);
        let subject = match (&patch.email, &patch.phone_number) {
            (Some(email), _) => Subject::Email(email),
            (None, Some(phone)) => Subject::Phone(phone),
            (None, None) => Subject::Uid(""),
        };
        let created: SignUpResponse = self
            .client
            .post("accounts", &SignUpRequest::from(patch))
            .await
            .map_err(|f| f.into_identity(subject))?;
        debug!(uid = %created.local_id, "account created");
        match self.lookup_uid(&created.local_id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                // The account exists; report what was written rather than fail.
                warn!(uid = %created.local_id, error = %e, "reading back created account failed");
                Ok(record_from_patch(created.local_id, patch))
            }
        }
    }

    async fn update(&self, uid: &str, patch: &Patch) -> Result<UserRecord, IdentityError> {
        note_unsupported(patch);
        let _: IgnoredAny = self
            .client
            .post("accounts:update", &UpdateRequest::from_patch(uid, patch))
            .await
            .map_err(|f| f.into_identity(Subject::Uid(uid)))?;
        self.lookup_uid(uid).await
    }

    async fn delete(&self, uid: &str) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .client
            .post("accounts:delete", &DeleteRequest { local_id: uid })
            .await
            .map_err(|f| f.into_identity(Subject::Uid(uid)))?;
        Ok(())
    }

    async fn set_claims(&self, uid: &str, claims: &Claims) -> Result<(), IdentityError> {
        let request = UpdateRequest::claims(uid, claims)?;
        let _: IgnoredAny = self
            .client
            .post("accounts:update", &request)
            .await
            .map_err(|f| f.into_identity(Subject::Uid(uid)))?;
        Ok(())
    }

    async fn verify_token(&self, raw_token: &str) -> Result<Token, IdentityError> {
        let payload = IdTokenPayload::decode(raw_token)?;
        payload.check_project(self.client.project_id())?;
        if payload.expires_at()? <= Utc::now() {
            return Err(IdentityError::ExpiredToken);
        }

        let request = LookupRequest {
            id_token: Some(raw_token.to_owned()),
            ..LookupRequest::default()
        };
        let account = self.lookup(&request, Subject::Token).await?;
        if account.uid != payload.sub {
            return Err(IdentityError::InvalidToken(
                "token subject does not match account".to_string(),
            ));
        }
        if account.disabled {
            return Err(IdentityError::InvalidToken("account is disabled".to_string()));
        }
        payload.into_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encode_unsigned;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LOOKUP: &str = "/v1/projects/demo/accounts:lookup";
    const UPDATE: &str = "/v1/projects/demo/accounts:update";

    fn backend(server: &MockServer) -> FirebaseBackend {
        let config = FirebaseConfig {
            project_id: Some("demo".to_string()),
            api_base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
        };
        FirebaseBackend::connect(&config, Arc::new(StaticAccessToken::new("access-123"))).unwrap()
    }

    fn error_body(message: &str) -> serde_json::Value {
        json!({"error": {"code": 400, "message": message}})
    }

    fn id_token(sub: &str, exp_offset: i64) -> String {
        let now = Utc::now().timestamp();
        encode_unsigned(&json!({
            "iss": "https://securetoken.google.com/demo",
            "aud": "demo",
            "sub": sub,
            "iat": now - 60,
            "exp": now + exp_offset,
            "firebase": {"sign_in_provider": "password"},
            "tier": "gold"
        }))
    }

    async fn mount_lookup_user(server: &MockServer, account: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": [account]})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn find_by_email_sends_authenticated_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .and(query_param("key", "test-key"))
            .and(header("authorization", "Bearer access-123"))
            .and(body_json(json!({"email": ["a@b.com"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{"localId": "u1", "email": "a@b.com", "emailVerified": true}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = backend(&server).find_by_email("a@b.com").await.unwrap();
        assert_eq!(record.uid, "u1");
        assert!(record.email_verified);
    }

    #[tokio::test]
    async fn empty_lookup_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = backend(&server).find_by_phone("+15550100").await.unwrap_err();
        match err {
            IdentityError::NotFound { by, key } => {
                assert_eq!(by, idbridge_core::LookupBy::Phone);
                assert_eq!(key, "+15550100");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_signs_up_then_reads_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo/accounts"))
            .and(body_json(json!({"email": "a@b.com", "displayName": "Ada"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"localId": "u9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .and(body_json(json!({"localId": ["u9"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{"localId": "u9", "email": "a@b.com", "displayName": "Ada"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let patch = Patch {
            email: Some("a@b.com".into()),
            display_name: Some("Ada".into()),
            whatsapp_number: Some("+15550100".into()),
            ..Patch::default()
        };
        let record = backend(&server).create(&patch).await.unwrap();
        assert_eq!(record.uid, "u9");
        assert_eq!(record.display_name.as_deref(), Some("Ada"));
        assert!(record.whatsapp_number.is_none());
    }

    #[tokio::test]
    async fn create_survives_failed_read_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"localId": "u9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let patch = Patch {
            email: Some("a@b.com".into()),
            disabled: Some(true),
            ..Patch::default()
        };
        let record = backend(&server).create(&patch).await.unwrap();
        assert_eq!(record.uid, "u9");
        assert_eq!(record.email.as_deref(), Some("a@b.com"));
        assert!(record.disabled);
        assert!(!record.email_verified);
    }

    #[tokio::test]
    async fn create_conflict_maps_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo/accounts"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body("EMAIL_EXISTS")))
            .mount(&server)
            .await;

        let patch = Patch {
            email: Some("a@b.com".into()),
            ..Patch::default()
        };
        let err = backend(&server).create(&patch).await.unwrap_err();
        assert!(matches!(err, IdentityError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPDATE))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body("USER_NOT_FOUND")))
            .mount(&server)
            .await;

        let patch = Patch {
            display_name: Some("Ada".into()),
            ..Patch::default()
        };
        let err = backend(&server).update("ghost", &patch).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_invalid_field_is_validation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPDATE))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(error_body("INVALID_PHONE_NUMBER : TOO_SHORT")),
            )
            .mount(&server)
            .await;

        let patch = Patch {
            phone_number: Some("12".into()),
            ..Patch::default()
        };
        let err = backend(&server).update("u1", &patch).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(msg) if msg.contains("TOO_SHORT")));
    }

    #[tokio::test]
    async fn set_claims_sends_custom_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPDATE))
            .and(body_json(json!({
                "localId": "u1",
                "customAttributes": "{\"role\":\"admin\"}"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"localId": "u1"})))
            .expect(1)
            .mount(&server)
            .await;

        let claims = idbridge_core::Claims::from_iter([("role".to_string(), json!("admin"))]);
        backend(&server).set_claims("u1", &claims).await.unwrap();
    }

    #[tokio::test]
    async fn delete_posts_local_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo/accounts:delete"))
            .and(body_json(json!({"localId": "u1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        backend(&server).delete("u1").await.unwrap();
    }

    #[tokio::test]
    async fn verify_token_checks_with_provider() {
        let server = MockServer::start().await;
        let raw = id_token("u1", 3600);
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .and(body_json(json!({"idToken": &raw})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{"localId": "u1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = backend(&server).verify_token(&raw).await.unwrap();
        assert_eq!(token.uid(), "u1");
        assert_eq!(token.claim("tier"), Some(&json!("gold")));
        assert_eq!(token.sign_in_provider(), Some("password"));
    }

    #[tokio::test]
    async fn malformed_token_never_reaches_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let err = backend(&server).verify_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
        let err = backend(&server)
            .verify_token(&id_token("u1", -10))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::ExpiredToken));
    }

    #[tokio::test]
    async fn token_for_another_project_never_reaches_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{"localId": "u1"}]
            })))
            .expect(0)
            .mount(&server)
            .await;

        let now = Utc::now().timestamp();
        let foreign = encode_unsigned(&json!({
            "iss": "https://securetoken.google.com/other",
            "aud": "other",
            "sub": "u1",
            "iat": now - 60,
            "exp": now + 3600
        }));
        let err = backend(&server).verify_token(&foreign).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));

        let wrong_issuer = encode_unsigned(&json!({
            "iss": "https://evil.example/demo",
            "aud": "demo",
            "sub": "u1",
            "iat": now - 60,
            "exp": now + 3600
        }));
        let err = backend(&server).verify_token(&wrong_issuer).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn api_key_is_query_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .and(query_param("key", "a+b&c=d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{"localId": "u1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = FirebaseConfig {
            project_id: Some("demo".to_string()),
            api_base_url: server.uri(),
            api_key: Some("a+b&c=d".to_string()),
            timeout_secs: 5,
        };
        let backend =
            FirebaseBackend::connect(&config, Arc::new(StaticAccessToken::emulator())).unwrap();
        assert_eq!(backend.find_by_email("a@b.com").await.unwrap().uid, "u1");
    }

    #[tokio::test]
    async fn rejected_and_disabled_tokens_are_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOOKUP))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_body("INVALID_ID_TOKEN")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_lookup_user(&server, json!({"localId": "u1", "disabled": true})).await;

        let backend = backend(&server);
        let raw = id_token("u1", 3600);
        assert!(matches!(
            backend.verify_token(&raw).await,
            Err(IdentityError::InvalidToken(_))
        ));
        assert!(matches!(
            backend.verify_token(&raw).await,
            Err(IdentityError::InvalidToken(msg)) if msg.contains("disabled")
        ));
    }

    #[tokio::test]
    async fn token_for_another_account_is_invalid() {
        let server = MockServer::start().await;
        mount_lookup_user(&server, json!({"localId": "someone-else"})).await;

        let err = backend(&server)
            .verify_token(&id_token("u1", 3600))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn server_errors_are_backend_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = backend(&server).find_by_email("a@b.com").await.unwrap_err();
        assert!(matches!(err, IdentityError::Backend(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn health_check_reports_healthy_with_token() {
        let server = MockServer::start().await;
        let backend = backend(&server);
        assert_eq!(backend.name(), "firebase");
        assert_eq!(backend.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn connect_without_project_is_init_error() {
        let err = FirebaseBackend::connect(
            &FirebaseConfig::default(),
            Arc::new(StaticAccessToken::emulator()),
        )
        .unwrap_err();
        assert!(matches!(err, IdentityError::Init(_)));
    }
}
