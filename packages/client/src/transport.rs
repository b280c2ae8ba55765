//! Paced WebSocket transport.
//!
//! ## Tasks
//!
//! - sender: drains the bounded outbound queue, sleeping [`SEND_INTERVAL`]
//!   after every frame so the server's flood protection never triggers
//! - receiver: forwards text frames to the inbound channel and publishes the
//!   `finished` signal when the stream ends
//!
//! Dropping both tasks drops both halves of the socket, which is how
//! [`Transport::close`] tears the connection down.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};

use crate::error::TransportError;

/// Pause after each outbound frame.
pub const SEND_INTERVAL: Duration = Duration::from_millis(400);

/// Upper bound on how long `close` waits for the receiver to finish.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

const OUTBOUND_CAPACITY: usize = 32;
const INBOUND_CAPACITY: usize = 64;

/// Something text frames can be written to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Queue a text frame for delivery.
    async fn send_text(&self, frame: String) -> Result<(), TransportError>;

    /// Close the connection. Never fails and may be called more than once.
    async fn close(&self);
}

/// Showdown WebSocket connection
pub struct Transport {
    outbound: mpsc::Sender<Message>,
    finished: watch::Receiver<bool>,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Transport {
    /// Dial `url` and start the sender and receiver tasks.
    ///
    /// # Returns
    ///
    /// The transport and the stream of inbound text frames. The stream ends
    /// when the connection is gone.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<String>), TransportError> {
        let (ws_stream, _response) = connect_async(url).await?;
        tracing::info!("Connected to {}", url);

        let (write, read) = ws_stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (finished_tx, finished_rx) = watch::channel(false);

        let sender = sender_loop(outbound_rx, write, finished_rx.clone());
        let receiver = receiver_loop(read, inbound_tx, outbound_tx.clone(), finished_tx);

        Ok((
            Self {
                outbound: outbound_tx,
                finished: finished_rx,
                tasks: Mutex::new(Some((sender, receiver))),
            },
            inbound_rx,
        ))
    }

    fn take_tasks(&self) -> Option<(JoinHandle<()>, JoinHandle<()>)> {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl FrameSink for Transport {
    async fn send_text(&self, frame: String) -> Result<(), TransportError> {
        tracing::debug!("> {}", frame);
        self.outbound
            .send(Message::Text(frame.into()))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&self) {
        // Queueing the close frame and the handshake share one deadline.
        let deadline = tokio::time::Instant::now() + CLOSE_TIMEOUT;
        let close = tokio::time::timeout_at(deadline, self.outbound.send(close_frame())).await;
        if !matches!(close, Ok(Ok(()))) {
            tracing::debug!("Close frame could not be queued");
        }

        let mut finished = self.finished.clone();
        let done = *finished.borrow_and_update();
        if !done
            && tokio::time::timeout_at(deadline, finished.changed())
                .await
                .is_err()
        {
            tracing::debug!("Server did not finish the close handshake in time");
        }

        if let Some((sender, receiver)) = self.take_tasks() {
            sender.abort();
            receiver.abort();
            let _ = sender.await;
            let _ = receiver.await;
            tracing::debug!("Transport closed");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some((sender, receiver)) = self.take_tasks() {
            sender.abort();
            receiver.abort();
        }
    }
}

fn close_frame() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }))
}

/// Spawns the task that writes queued frames to the socket, one every
/// [`SEND_INTERVAL`].
fn sender_loop<S>(
    mut rx: mpsc::Receiver<Message>,
    mut write: S,
    mut finished: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: futures_util::Sink<Message> + Unpin + Send + 'static,
    S::Error: std::fmt::Display,
{
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                _ = finished.changed() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            if let Err(e) = write.send(message).await {
                tracing::warn!("Failed to send frame: {}", e);
                break;
            }
            tokio::time::sleep(SEND_INTERVAL).await;
        }
        // Dropping `rx` makes every later `send_text` fail with `Closed`.
    })
}

/// Spawns the task that forwards inbound text frames.
fn receiver_loop<S>(
    mut read: S,
    inbound: mpsc::Sender<String>,
    outbound: mpsc::Sender<Message>,
    finished: watch::Sender<bool>,
) -> JoinHandle<()>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin
        + Send
        + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    tracing::debug!("< {}", text);
                    if inbound.send(text.to_string()).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                }
                Ok(other) => {
                    tracing::warn!("Unexpected non-text frame ({} bytes), closing", other.len());
                    if outbound.try_send(close_frame()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break;
                }
            }
        }

        let _ = finished.send(true);
        tracing::debug!("Receiver finished");
    })
}
