//! Admin authentication.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::transport::{AuthHeaders, Transport};
use super::RemoteClient;
use crate::error::{Error, Result};

const ADMIN_AUTH_PATH: &str = "/api/admins/auth-with-password";

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
}

impl<T: Transport> RemoteClient<T> {
    /// Log in as an admin and build the bearer header for later requests.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` if the server rejects the credentials or its
    /// response carries no token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthHeaders> {
        let request = self
            .request(Method::POST, ADMIN_AUTH_PATH)
            .json(json!({ "identity": email, "password": password }));

        let response = self.send(&request).await.map_err(|e| match e {
            Error::Http { .. } => Error::AuthFailed(e.diagnostic()),
            other => other,
        })?;

        let auth: AuthResponse = response.json()?;
        match auth.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!(email, "Authenticated as admin");
                Ok(AuthHeaders::bearer(&token))
            }
            None => Err(Error::AuthFailed(
                "Authentication response missing token".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::MockTransport;
    use crate::remote::ApiResponse;

    #[tokio::test]
    async fn test_authenticate_builds_bearer_header() {
        let transport = MockTransport::scripted(vec![ApiResponse::new(200, r#"{"token":"abc"}"#)]);
        let client = RemoteClient::new(transport, "http://pb.local/");

        let headers = client.authenticate("admin@example.com", "pw").await.unwrap();

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("Authorization", "Bearer abc")]);

        let sent = &client.transport().requests()[0];
        assert_eq!(sent.url, "http://pb.local/api/admins/auth-with-password");
        assert_eq!(sent.body.as_ref().unwrap()["identity"], "admin@example.com");
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_failure() {
        let transport = MockTransport::scripted(vec![ApiResponse::new(200, r#"{"admin":{}}"#)]);
        let client = RemoteClient::new(transport, "http://pb.local");

        let err = client.authenticate("a@b.c", "pw").await.unwrap_err();

        assert!(matches!(err, Error::AuthFailed(ref m) if m.contains("missing token")));
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_auth_failure() {
        let transport = MockTransport::scripted(vec![ApiResponse::new(
            400,
            r#"{"message":"Failed to authenticate."}"#,
        )]);
        let client = RemoteClient::new(transport, "http://pb.local");

        let err = client.authenticate("a@b.c", "wrong").await.unwrap_err();

        assert!(matches!(err, Error::AuthFailed(ref m) if m.starts_with("HTTP 400")));
        assert_eq!(err.exit_code(), 5);
    }
}
