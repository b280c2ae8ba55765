//! HTTP login and server discovery against a local stand-in for the
//! Showdown web site.

use std::collections::HashMap;

use axum::{
    Form, Router,
    extract::Query,
    routing::{get, post},
};
use showdown_irc_client::{
    Authenticator, CrossDomainResolver, DiscoveryError, HttpAuthenticator, ServerAddress,
    ServerResolver,
};
use tokio::net::TcpListener;

async fn login(Form(form): Form<HashMap<String, String>>) -> String {
    let field = |name: &str| form.get(name).cloned().unwrap_or_default();
    if field("act") != "login" || field("pass") != "hunter2" {
        return "]{\"actionsuccess\":false}".to_string();
    }
    format!(
        "]{{\"actionsuccess\":true,\"assertion\":\"{}|{}\"}}",
        field("name"),
        field("challstr")
    )
}

async fn crossdomain(Query(query): Query<HashMap<String, String>>) -> String {
    match query.get("host").map(String::as_str) {
        Some("smogtours.psim.us") => {
            "<script>\nvar config = \"{\\\"host\\\":\\\"sim3.psim.us\\\",\\\"port\\\":8000}\";\n</script>"
                .to_string()
        }
        _ => "<script></script>".to_string(),
    }
}

/// Start the stand-in site and return its base URL.
async fn start_site() -> String {
    let app = Router::new()
        .route("/action.php", post(login))
        .route("/crossdomain.php", get(crossdomain));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

#[tokio::test]
async fn test_http_authenticator_posts_login_form() {
    // テスト項目: ログインフォームが POST され、アサーションが返る
    // given (前提条件):
    let base = start_site().await;
    let authenticator =
        HttpAuthenticator::with_endpoint(reqwest::Client::new(), format!("{}/action.php", base));

    // when (操作):
    let assertion = authenticator
        .assertion("Alice Smith", "hunter2", "4|abcdef")
        .await;

    // then (期待する結果):
    assert_eq!(assertion.unwrap(), "Alice Smith|4|abcdef");
}

#[tokio::test]
async fn test_http_authenticator_rejected_login() {
    // テスト項目: アサーションを含まないレスポンスはエラーになる
    // given (前提条件):
    let base = start_site().await;
    let authenticator =
        HttpAuthenticator::with_endpoint(reqwest::Client::new(), format!("{}/action.php", base));

    // when (操作):
    let assertion = authenticator
        .assertion("Alice Smith", "wrong", "4|abcdef")
        .await;

    // then (期待する結果):
    assert!(assertion.is_err());
}

#[tokio::test]
async fn test_cross_domain_resolver_qualifies_and_decodes() {
    // テスト項目: サーバー名が修飾され、公開設定からアドレスが解決される
    // given (前提条件):
    let base = start_site().await;
    let resolver =
        CrossDomainResolver::with_endpoint(reqwest::Client::new(), format!("{}/crossdomain.php", base));

    // when (操作):
    let address = resolver.resolve("smogtours").await;

    // then (期待する結果):
    assert_eq!(address.unwrap(), ServerAddress::new("sim3.psim.us", 8000));
}

#[tokio::test]
async fn test_cross_domain_resolver_unknown_server() {
    // テスト項目: 設定が公開されていないサーバーは存在しないエラーになる
    // given (前提条件):
    let base = start_site().await;
    let resolver =
        CrossDomainResolver::with_endpoint(reqwest::Client::new(), format!("{}/crossdomain.php", base));

    // when (操作):
    let address = resolver.resolve("nowhere").await;

    // then (期待する結果):
    assert!(matches!(address, Err(DiscoveryError::ServerNotFound)));
}
