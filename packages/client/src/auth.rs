//! Challenge/assertion login against the Showdown login server.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;

/// Login endpoint used by the official servers.
pub const ACTION_URL: &str = "https://play.pokemonshowdown.com/action.php";

/// Exchanges credentials and a server challenge for a signed assertion.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn assertion(
        &self,
        nickname: &str,
        password: &str,
        challenge: &str,
    ) -> Result<String, AuthError>;
}

/// [`Authenticator`] backed by an HTTP form POST.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAuthenticator {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, ACTION_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for HttpAuthenticator {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn assertion(
        &self,
        nickname: &str,
        password: &str,
        challenge: &str,
    ) -> Result<String, AuthError> {
        tracing::info!("Logging in as '{}'", nickname);
        let body = self
            .client
            .post(&self.endpoint)
            .form(&[
                ("act", "login"),
                ("name", nickname),
                ("pass", password),
                ("challstr", challenge),
            ])
            .send()
            .await?
            .bytes()
            .await?;

        parse_assertion(&body)
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "Assertion")]
    assertion: String,
}

/// Extract the assertion from a login response.
///
/// The body carries a one-byte anti-JSON-hijacking prefix (`]`) in front of
/// the JSON object.
pub fn parse_assertion(body: &[u8]) -> Result<String, AuthError> {
    let json = body.get(1..).ok_or(AuthError::EmptyResponse)?;
    if json.is_empty() {
        return Err(AuthError::EmptyResponse);
    }
    let response: LoginResponse = serde_json::from_slice(json)?;
    Ok(response.assertion)
}
