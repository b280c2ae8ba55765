//! Outbound IRC lines.
//!
//! Every line for one client goes through an [`IrcWriter`], a cheap clonable
//! handle on an unbounded channel. A single writer task owns the socket's
//! write half and drains the channel, so the connection task and the
//! session's dispatcher can both emit lines without sharing the socket.

use std::fmt::Display;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};

use crate::irc::{Numeric, line::frame, names::SERVER_NAME};

/// Nickname used in numerics before the client registered.
pub const UNREGISTERED_NICKNAME: &str = "*";

#[derive(Debug, Clone)]
pub struct IrcWriter {
    tx: mpsc::UnboundedSender<String>,
    nickname: String,
}

impl IrcWriter {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            nickname: UNREGISTERED_NICKNAME.to_string(),
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
    }

    /// Frame and queue `tokens`; the first token is the prefix.
    pub fn send<S: AsRef<str>>(&self, tokens: &[S]) {
        let tokens: Vec<String> = tokens
            .iter()
            .map(|token| single_line(token.as_ref()))
            .collect();
        self.push(frame(&tokens));
    }

    /// Like [`IrcWriter::send`] with the server name as prefix.
    pub fn send_global<S: AsRef<str>>(&self, tokens: &[S]) {
        let mut prefixed = Vec::with_capacity(tokens.len() + 1);
        prefixed.push(SERVER_NAME);
        prefixed.extend(tokens.iter().map(AsRef::as_ref));
        self.send(&prefixed);
    }

    /// `:showdown NOTICE <target> :<text>`
    pub fn notice(&self, target: &str, text: &str) {
        self.send_global(&["NOTICE", target, text]);
    }

    /// `:showdown <code> <nickname> <body>`
    ///
    /// # Arguments
    ///
    /// * `numeric` - reply code and template
    /// * `args` - values for the template's conversions, in order
    pub fn numeric(&self, numeric: Numeric, args: &[&dyn Display]) {
        let body = single_line(&numeric.render(args));
        self.push(format!(
            ":{} {} {} {}\r\n",
            SERVER_NAME, numeric, self.nickname, body
        ));
    }

    fn push(&self, line: String) {
        tracing::debug!("IRC <- {}", line.trim_end());
        if self.tx.send(line).is_err() {
            tracing::debug!("IRC writer is gone, line dropped");
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Spawns a task that writes every queued line to `sink`.
///
/// The task ends when every [`IrcWriter`] is dropped or a write fails, and
/// shuts the sink down on its way out.
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
pub fn spawn_writer<W>(mut rx: mpsc::UnboundedReceiver<String>, mut sink: W) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = sink.write_all(line.as_bytes()).await {
                tracing::warn!("Failed to write to IRC client: {}", e);
                break;
            }
        }
        if let Err(e) = sink.shutdown().await {
            tracing::debug!("IRC socket shutdown failed: {}", e);
        }
    })
}
