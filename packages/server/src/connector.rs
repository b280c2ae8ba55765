//! Opening Showdown sessions for IRC clients.

use std::sync::Arc;

use async_trait::async_trait;
use showdown_irc_client::{
    Authenticator, CrossDomainResolver, HttpAuthenticator, LoginData, LoginSignal, ServerResolver,
    Session, SessionError,
};

use crate::translate::Translator;

/// Creates the Showdown session of a registered IRC client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// # Arguments
    ///
    /// * `login` - credentials and rooms to join, consumed by the session
    /// * `translator` - receives every Showdown event of the session
    ///
    /// # Returns
    ///
    /// The session handle and the signal that resolves once login finished
    async fn open(
        &self,
        login: LoginData,
        translator: Translator,
    ) -> Result<(Session, LoginSignal), SessionError>;
}

/// Resolves the configured server and connects to it over WebSocket.
pub struct ShowdownConnector {
    server: String,
    resolver: Arc<dyn ServerResolver>,
    authenticator: Arc<dyn Authenticator>,
}

impl ShowdownConnector {
    /// Connector for `server` using the public discovery and login endpoints.
    pub fn new(server: impl Into<String>) -> Self {
        Self::with_parts(
            server,
            Arc::new(CrossDomainResolver::default()),
            Arc::new(HttpAuthenticator::default()),
        )
    }

    pub fn with_parts(
        server: impl Into<String>,
        resolver: Arc<dyn ServerResolver>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            server: server.into(),
            resolver,
            authenticator,
        }
    }
}

#[async_trait]
impl SessionFactory for ShowdownConnector {
    async fn open(
        &self,
        login: LoginData,
        translator: Translator,
    ) -> Result<(Session, LoginSignal), SessionError> {
        let address = self.resolver.resolve(&self.server).await?;
        tracing::info!(
            "Connecting '{}' to {}",
            login.nickname,
            address.websocket_url()
        );
        Session::connect(login, &address, self.authenticator.clone(), translator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::IrcWriter;
    use showdown_irc_client::{AuthError, DiscoveryError, ServerAddress};
    use std::sync::Mutex;
    use tokio::sync::{mpsc, watch};

    struct MissingServer {
        asked: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ServerResolver for MissingServer {
        async fn resolve(&self, server: &str) -> Result<ServerAddress, DiscoveryError> {
            self.asked.lock().unwrap().push(server.to_string());
            Err(DiscoveryError::ServerNotFound)
        }
    }

    struct UnusedAuthenticator;

    #[async_trait]
    impl Authenticator for UnusedAuthenticator {
        async fn assertion(
            &self,
            _nickname: &str,
            _password: &str,
            _challenge: &str,
        ) -> Result<String, AuthError> {
            Err(AuthError::EmptyResponse)
        }
    }

    #[tokio::test]
    async fn test_open_reports_unknown_server() {
        // テスト項目: サーバーが見つからない場合、接続せずにエラーを返す
        // given (前提条件):
        let asked = Arc::new(Mutex::new(Vec::new()));
        let connector = ShowdownConnector::with_parts(
            "nowhere",
            Arc::new(MissingServer {
                asked: asked.clone(),
            }),
            Arc::new(UnusedAuthenticator),
        );
        let (lines, _lines_rx) = mpsc::unbounded_channel();
        let (shutdown, _shutdown_rx) = watch::channel(false);
        let translator = Translator::new(IrcWriter::new(lines), shutdown);

        // when (操作):
        let result = connector.open(LoginData::default(), translator).await;

        // then (期待する結果):
        let Err(e) = result else {
            panic!("expected an error");
        };
        assert_eq!(e.to_string(), "Server does not exist");
        assert_eq!(*asked.lock().unwrap(), vec!["nowhere".to_string()]);
    }
}
