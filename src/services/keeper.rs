//! WebSocket connection keeper.
//!
//! Holds one long-lived websocket open as a liveness side-channel and, on a
//! fixed timer, signals the watch loop that a check is due. The socket does
//! not carry announcement data; the actual check is done by the source reader.
//!
//! Key behaviors:
//! 1. Answers server `Ping` frames with `Pong`
//! 2. Sends a text keepalive when nothing arrives within the idle window
//! 3. Reconnects after a fixed delay, forever
//! 4. Check signals keep firing while disconnected
//! 5. Warns the operator once per run of connection failures

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

use crate::models::{Alert, KeeperConfig};
use crate::pipeline::AlertDispatcher;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Connection closed by server: {0}")]
    ConnectionClosed(String),
}

/// Maintains the websocket and emits check signals.
pub struct ConnectionKeeper {
    config: KeeperConfig,
    check_interval: Duration,
    signal: Arc<Notify>,
    alerts: Option<AlertDispatcher>,
}

impl ConnectionKeeper {
    /// `signal` is the single-slot trigger shared with the watch loop.
    pub fn new(config: KeeperConfig, check_interval: Duration, signal: Arc<Notify>) -> Self {
        Self {
            config,
            check_interval,
            signal,
            alerts: None,
        }
    }

    /// Report connection failures and recovery to the operator.
    pub fn with_alerts(mut self, dispatcher: AlertDispatcher) -> Self {
        self.alerts = Some(dispatcher);
        self
    }

    async fn announce(&self, alert: Alert) {
        if let Some(dispatcher) = &self.alerts {
            dispatcher.announce(&alert).await;
        }
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.idle_timeout_secs)
    }

    fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_delay_secs)
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        tokio::join!(
            self.signal_loop(shutdown.clone()),
            self.connection_loop(shutdown)
        );
        log::info!("Connection keeper stopped");
    }

    /// Fire a check signal on every tick, connected or not.
    async fn signal_loop(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The watch loop runs its first cycle on its own.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    log::debug!("Keeper: check due");
                    self.signal.notify_one();
                }
            }
        }
    }

    async fn connection_loop(&self, shutdown: CancellationToken) {
        // Set while a failure has been reported and no connection succeeded since.
        let mut alerted = false;
        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = self.connect() => result,
            };

            let error = match result {
                Ok(mut ws) => {
                    if alerted {
                        alerted = false;
                        self.announce(Alert::Status("WebSocket reconnected".to_string()))
                            .await;
                    }
                    let outcome = self.run_session(&mut ws, &shutdown).await;
                    if let Err(e) = ws.close(None).await {
                        log::debug!("WebSocket close failed: {}", e);
                    }
                    match outcome {
                        Ok(()) => return,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            log::error!("WebSocket error: {}", error);
            if !alerted {
                alerted = true;
                self.announce(Alert::Warning(format!("WebSocket connection error: {error}")))
                    .await;
            }

            log::info!(
                "Reconnecting in {}s",
                self.config.reconnect_delay_secs
            );
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay()) => {}
            }
        }
    }

    async fn connect(&self) -> Result<WsStream, KeeperError> {
        log::info!("Connecting to WebSocket: {}", self.config.url);
        let (mut ws, _response) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| KeeperError::ConnectionFailed(e.to_string()))?;

        if let Some(subscribe) = &self.config.subscribe_message {
            ws.send(Message::Text(subscribe.to_string()))
                .await
                .map_err(|e| KeeperError::SendFailed(e.to_string()))?;
            log::debug!("Sent subscribe message: {}", subscribe);
        }

        log::info!("WebSocket connected");
        Ok(ws)
    }

    /// Serve one connection. Returns `Ok(())` only on shutdown.
    async fn run_session(
        &self,
        ws: &mut WsStream,
        shutdown: &CancellationToken,
    ) -> Result<(), KeeperError> {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                next = timeout(self.idle_timeout(), ws.next()) => next,
            };

            match next {
                Err(_elapsed) => {
                    log::debug!("Connection idle, sending keepalive");
                    ws.send(Message::Text(self.config.ping_message.clone()))
                        .await
                        .map_err(|e| KeeperError::SendFailed(e.to_string()))?;
                }
                Ok(Some(Ok(msg))) => handle_message(ws, msg).await?,
                Ok(Some(Err(e))) => return Err(KeeperError::ReceiveFailed(e.to_string())),
                Ok(None) => {
                    return Err(KeeperError::ConnectionClosed("stream ended".to_string()));
                }
            }
        }
    }
}

async fn handle_message(ws: &mut WsStream, msg: Message) -> Result<(), KeeperError> {
    match msg {
        Message::Ping(data) => {
            ws.send(Message::Pong(data))
                .await
                .map_err(|e| KeeperError::SendFailed(e.to_string()))?;
            log::debug!("Answered ping");
        }
        Message::Pong(_) => log::debug!("Received pong"),
        Message::Text(text) => log::debug!("Received WebSocket message: {}", text),
        Message::Close(frame) => {
            let reason = frame
                .map(|f| f.reason.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(KeeperError::ConnectionClosed(reason));
        }
        Message::Binary(_) | Message::Frame(_) => {}
    }
    Ok(())
}
