//! Gateway execution logic.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

use crate::{
    config::GatewayConfig,
    connection::{GatewayContext, serve_connection},
    connector::ShowdownConnector,
    error::GatewayError,
    signal::shutdown_signal,
};

/// Run the IRC gateway until Ctrl+C or SIGTERM.
///
/// # Arguments
///
/// * `config` - listener address, Showdown server and login settings
pub async fn run_server(config: GatewayConfig) -> Result<(), GatewayError> {
    let connector = Arc::new(ShowdownConnector::new(config.server.clone()));
    let context = Arc::new(GatewayContext::new(&config, connector));

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!("IRC gateway listening on {}", listener.local_addr()?);
    tracing::info!("Proxying to Showdown server '{}'", config.server);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    serve(listener, context, shutdown_signal()).await;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Accept IRC clients on `listener` until `shutdown` resolves.
///
/// Every client is served on its own task. Clients that are still connected
/// when the loop stops keep running until the runtime goes away.
pub async fn serve<F>(listener: TcpListener, context: Arc<GatewayContext>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::info!("IRC client {} connected", peer);
                    let context = context.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, context).await;
                        tracing::info!("IRC client {} disconnected", peer);
                    });
                }
                Err(e) => tracing::warn!("Failed to accept IRC client: {}", e),
            },
        }
    }
}
