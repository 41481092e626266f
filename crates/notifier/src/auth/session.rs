//! OAuth session: the single live credential for one mailbox configuration

use chrono::Utc;
use log::{debug, error, info, warn};
use url::Url;

use super::TokenStore;
use crate::error::{AuthRequired, ProviderError, SyncError};
use crate::models::{Credential, MessageHeaders, MessageId};
use crate::provider::{MailProvider, TokenGrant};

/// Refresh access tokens this long before they actually expire
const EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

/// Owns the credential and routes every provider call through it
///
/// Calls made without a valid credential fail with [`SyncError::Auth`]
/// before touching the network. Expired access tokens are refreshed through
/// the provider and the result is persisted.
pub struct OAuthSession<P> {
    provider: P,
    store: TokenStore,
    credential: Credential,
    mailbox: String,
    scopes: Vec<String>,
}

impl<P: MailProvider> OAuthSession<P> {
    /// Create a session, loading any previously saved credential
    pub fn new(provider: P, store: TokenStore, mailbox: impl Into<String>, scopes: Vec<String>) -> Self {
        let credential = store.load();
        Self {
            provider,
            store,
            credential,
            mailbox: mailbox.into(),
            scopes,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn is_authorized(&self) -> bool {
        self.credential.is_valid()
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Consent URL requesting offline access with a forced consent prompt
    pub fn authorization_url(&self) -> String {
        self.provider.authorization_url(&self.scopes)
    }

    /// Trade an authorization code for a credential and persist it
    pub fn exchange_code(&mut self, code: &str) -> Result<&Credential, SyncError> {
        if code.is_empty() {
            return Err(AuthRequired("empty authorization code".to_string()).into());
        }

        let grant = self
            .provider
            .exchange_code(code)
            .map_err(|e| AuthRequired(format!("authorization code exchange failed: {}", e)))?;

        info!("Received tokens for mailbox {}", self.mailbox);
        self.credential = credential_from_grant(grant, None);
        self.persist();
        Ok(&self.credential)
    }

    /// The in-memory credential, refreshed first if it is known to be expired
    pub fn current_credential(&mut self) -> Result<&Credential, SyncError> {
        if !self.credential.is_valid() {
            return Err(AuthRequired("no stored credentials".to_string()).into());
        }

        let now = Utc::now().timestamp_millis();
        if self.credential.access_token().is_none()
            || self.credential.expires_within(now, EXPIRY_BUFFER_MS)
        {
            self.refresh()?;
        }

        Ok(&self.credential)
    }

    /// List unread inbox message ids
    pub fn list_unread(&mut self, max_results: usize) -> Result<Vec<MessageId>, SyncError> {
        self.call(|provider, token, mailbox| provider.list_unread(token, mailbox, max_results))
    }

    /// Fetch the metadata headers of one message
    pub fn get_message_headers(&mut self, id: &MessageId) -> Result<MessageHeaders, SyncError> {
        self.call(|provider, token, mailbox| provider.get_message_headers(token, mailbox, id))
    }

    /// Run a provider call with the current access token
    ///
    /// A rejected token is refreshed once and the call retried.
    fn call<T>(
        &mut self,
        op: impl Fn(&P, &str, &str) -> Result<T, ProviderError>,
    ) -> Result<T, SyncError> {
        let token = self.access_token_for_call()?;
        match op(&self.provider, &token, &self.mailbox) {
            Err(e) if e.is_auth() && self.credential.refresh_token().is_some() => {
                debug!("Access token rejected ({}), refreshing", e);
                self.refresh()?;
                let token = self.access_token_for_call()?;
                op(&self.provider, &token, &self.mailbox).map_err(SyncError::from)
            }
            result => result.map_err(SyncError::from),
        }
    }

    fn access_token_for_call(&mut self) -> Result<String, SyncError> {
        let credential = self.current_credential()?;
        Ok(credential.access_token().unwrap_or_default().to_string())
    }

    fn refresh(&mut self) -> Result<(), SyncError> {
        let Some(refresh_token) = self.credential.refresh_token().map(str::to_string) else {
            return Err(AuthRequired("access token expired and no refresh token".to_string()).into());
        };

        match self.provider.refresh_access_token(&refresh_token) {
            Ok(grant) => {
                debug!("Refreshed access token for mailbox {}", self.mailbox);
                self.credential = credential_from_grant(grant, Some(refresh_token));
                self.persist();
                Ok(())
            }
            Err(e) if e.is_auth() => {
                warn!("Token refresh rejected: {}", e);
                Err(AuthRequired(format!("token refresh failed: {}", e)).into())
            }
            Err(e) => Err(SyncError::Transient(format!("token refresh failed: {}", e))),
        }
    }

    /// Save the credential; the in-memory copy stays usable if this fails
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.credential) {
            error!("Failed to save tokens: {:#}", e);
        }
    }
}

/// Build a credential from a token grant, keeping `previous_refresh` when
/// the provider did not issue a new refresh token
fn credential_from_grant(grant: TokenGrant, previous_refresh: Option<String>) -> Credential {
    let expiry_date = grant.expires_in.map(|secs| {
        let millis = i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000);
        Utc::now().timestamp_millis().saturating_add(millis)
    });

    Credential {
        access_token: Some(grant.access_token),
        refresh_token: grant.refresh_token.or(previous_refresh),
        expiry_date,
    }
}

/// Pull the authorization code out of an OAuth redirect URL
pub fn extract_auth_code(redirect_url: &str) -> Result<String, SyncError> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|e| AuthRequired(format!("invalid redirect URL: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(AuthRequired(format!("authorization denied: {}", value)).into());
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| AuthRequired("no authorization code in redirect URL".to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fake::{self, FakeProvider};
    use tempfile::TempDir;

    fn session_with(dir: &TempDir, provider: &FakeProvider) -> OAuthSession<FakeProvider> {
        let store = TokenStore::new(dir.path().join("gmail-oauth.json"));
        OAuthSession::new(provider.clone(), store, "me", vec!["scope-a".to_string()])
    }

    fn save_credential(dir: &TempDir, credential: &Credential) {
        TokenStore::new(dir.path().join("gmail-oauth.json"))
            .save(credential)
            .unwrap();
    }

    #[test]
    fn test_fails_fast_without_credentials() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let mut session = session_with(&dir, &provider);

        assert!(!session.is_authorized());
        let err = session.list_unread(5).unwrap_err();
        assert!(err.is_auth());
        assert_eq!(provider.state().list_calls, 0);
    }

    #[test]
    fn test_loads_saved_credentials() {
        let dir = TempDir::new().unwrap();
        save_credential(&dir, &Credential::new("saved", Some("refresh".to_string())));
        let provider = FakeProvider::new();
        provider.set_unread(&["m1"]);

        let mut session = session_with(&dir, &provider);
        assert!(session.is_authorized());
        assert_eq!(session.list_unread(5).unwrap(), vec![MessageId::new("m1")]);
        assert_eq!(provider.state().refresh_calls, 0);
    }

    #[test]
    fn test_exchange_code_persists_credentials() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        let mut session = session_with(&dir, &provider);

        let credential = session.exchange_code("auth-code").unwrap().clone();
        assert_eq!(credential.access_token(), Some("exchanged-access"));
        assert_eq!(credential.refresh_token(), Some("exchanged-refresh"));
        assert!(credential.expiry_date.is_some());

        let reloaded = TokenStore::new(dir.path().join("gmail-oauth.json")).load();
        assert_eq!(reloaded, credential);
        assert_eq!(provider.state().exchanged_codes, vec!["auth-code".to_string()]);
    }

    #[test]
    fn test_exchange_code_failure_is_auth_error() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new();
        provider.state().exchange = Err(fake::server_error());
        let mut session = session_with(&dir, &provider);

        assert!(session.exchange_code("code").unwrap_err().is_auth());
        assert!(!session.is_authorized());
    }

    #[test]
    fn test_refreshes_expired_token_before_call() {
        let dir = TempDir::new().unwrap();
        let expired = Credential::new("stale", Some("refresh".to_string())).with_expiry_date(0);
        save_credential(&dir, &expired);
        let provider = FakeProvider::new();
        provider.state().rejected_token = Some("stale".to_string());
        let mut session = session_with(&dir, &provider);

        session.list_unread(5).unwrap();

        assert_eq!(provider.state().refresh_calls, 1);
        let credential = session.credential();
        assert_eq!(credential.access_token(), Some("refreshed-access"));
        // Refresh responses without a refresh token keep the old one
        assert_eq!(credential.refresh_token(), Some("refresh"));

        let reloaded = TokenStore::new(dir.path().join("gmail-oauth.json")).load();
        assert_eq!(&reloaded, credential);
    }

    #[test]
    fn test_refresh_only_credential_refreshes_first() {
        let dir = TempDir::new().unwrap();
        save_credential(
            &dir,
            &Credential {
                refresh_token: Some("refresh".to_string()),
                ..Default::default()
            },
        );
        let provider = FakeProvider::new();
        let mut session = session_with(&dir, &provider);

        assert_eq!(
            session.current_credential().unwrap().access_token(),
            Some("refreshed-access")
        );
    }

    #[test]
    fn test_rejected_token_is_refreshed_and_retried() {
        let dir = TempDir::new().unwrap();
        save_credential(&dir, &Credential::new("revoked", Some("refresh".to_string())));
        let provider = FakeProvider::new();
        provider.state().rejected_token = Some("revoked".to_string());
        provider.set_unread(&["m1", "m2"]);
        let mut session = session_with(&dir, &provider);

        assert_eq!(session.list_unread(5).unwrap().len(), 2);
        assert_eq!(provider.state().refresh_calls, 1);
    }

    #[test]
    fn test_refresh_rejection_is_auth_error() {
        let dir = TempDir::new().unwrap();
        save_credential(&dir, &Credential::new("revoked", Some("refresh".to_string())));
        let provider = FakeProvider::new();
        {
            let mut state = provider.state();
            state.rejected_token = Some("revoked".to_string());
            state.refresh = Err(ProviderError::Api {
                status: 400,
                reason: Some("invalid_grant".to_string()),
                message: "Token has been expired or revoked.".to_string(),
            });
        }
        let mut session = session_with(&dir, &provider);

        assert!(session.list_unread(5).unwrap_err().is_auth());
    }

    #[test]
    fn test_rejected_token_without_refresh_token_is_auth_error() {
        let dir = TempDir::new().unwrap();
        save_credential(&dir, &Credential::new("revoked", None));
        let provider = FakeProvider::new();
        provider.state().rejected_token = Some("revoked".to_string());
        let mut session = session_with(&dir, &provider);

        assert!(session.list_unread(5).unwrap_err().is_auth());
        assert_eq!(provider.state().refresh_calls, 0);
    }

    #[test]
    fn test_non_auth_failure_is_transient() {
        let dir = TempDir::new().unwrap();
        save_credential(&dir, &Credential::new("ok", None));
        let provider = FakeProvider::new();
        provider.fail_list(ProviderError::Transport("timed out".to_string()));
        let mut session = session_with(&dir, &provider);

        assert!(matches!(
            session.list_unread(5).unwrap_err(),
            SyncError::Transient(_)
        ));
    }

    #[test]
    fn test_authorization_url_uses_scopes() {
        let dir = TempDir::new().unwrap();
        let session = session_with(&dir, &FakeProvider::new());
        assert_eq!(
            session.authorization_url(),
            format!("{}?scope=scope-a", fake::FAKE_AUTH_URL)
        );
    }

    #[test]
    fn test_huge_expires_in_does_not_wrap() {
        let credential = credential_from_grant(
            TokenGrant {
                access_token: "a".to_string(),
                refresh_token: None,
                expires_in: Some(u64::MAX),
            },
            Some("r".to_string()),
        );

        assert_eq!(credential.expiry_date, Some(i64::MAX));
        assert_eq!(credential.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_extract_auth_code() {
        let code = extract_auth_code(
            "http://localhost:8080/gmail-notifier/redirect.html?code=4%2F0Abc-123&scope=x",
        )
        .unwrap();
        assert_eq!(code, "4/0Abc-123");
    }

    #[test]
    fn test_extract_auth_code_errors() {
        assert!(extract_auth_code("http://localhost/redirect?error=access_denied")
            .unwrap_err()
            .is_auth());
        assert!(extract_auth_code("http://localhost/redirect?code=").is_err());
        assert!(extract_auth_code("http://localhost/redirect").is_err());
        assert!(extract_auth_code("not a url").is_err());
    }
}
