//! One live WebSocket per selected chat.
//!
//! [`ChatConnection::open`] makes exactly one connection attempt; there is no
//! automatic reconnect, so a dropped transport stays down until the chat is
//! reselected. Only the inbound task writes to the transcript.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;
use crate::messages::{mentions_bot, ChatMessage, Sender};
use crate::session::Session;
use crate::transcript::{ChatEvent, Transcript};

/// The socket is addressed by chat id and carries the bearer token as its
/// connection credential.
fn socket_url(ws_origin: &str, chat_id: i64, token: &str) -> String {
    format!("{ws_origin}/ws/{chat_id}?token={token}")
}

pub struct ChatConnection {
    chat_id: i64,
    transcript: Arc<RwLock<Transcript>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    pending_bot: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl ChatConnection {
    /// Connect to `chat_id`, seeding the log from the history fetch before
    /// any live frame is applied. Returns the connection plus the event
    /// stream the view drains.
    pub async fn open(
        ws_origin: &str,
        chat_id: i64,
        session: &Session,
        history: Vec<ChatMessage>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>), ClientError> {
        let url = socket_url(ws_origin, chat_id, &session.token);
        let (stream, _) = connect_async(url.as_str()).await?;
        info!("connected to chat {chat_id}");
        let (mut ws_tx, mut ws_rx) = stream.split();

        let transcript = Arc::new(RwLock::new(Transcript::new(history)));
        let pending_bot = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = ws_tx.send(frame).await {
                    error!("chat {chat_id}: failed to send frame: {e}");
                    break;
                }
            }
            // Outbound side released: tell the server we are leaving.
            let _ = ws_tx.send(Message::Close(None)).await;
        });

        let reader = {
            let transcript = Arc::clone(&transcript);
            let pending_bot = Arc::clone(&pending_bot);
            let username = session.username.clone();
            tokio::spawn(async move {
                while let Some(frame) = ws_rx.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            let message: ChatMessage = match serde_json::from_str(text.as_str()) {
                                Ok(message) => message,
                                Err(e) => {
                                    warn!("chat {chat_id}: dropping malformed frame: {e}");
                                    continue;
                                }
                            };
                            if message.sender == Sender::Bot {
                                pending_bot.store(false, Ordering::Relaxed);
                            }
                            let events =
                                transcript.write().await.apply_inbound(message, &username);
                            for event in events {
                                if event_tx.send(event).is_err() {
                                    // Nobody is watching anymore.
                                    return;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("chat {chat_id}: closed by server");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("chat {chat_id}: transport error: {e}");
                            break;
                        }
                    }
                }
                let _ = event_tx.send(ChatEvent::Closed);
            })
        };

        Ok((
            ChatConnection {
                chat_id,
                transcript,
                outbound: Some(outbound_tx),
                pending_bot,
                reader: Some(reader),
            },
            event_rx,
        ))
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Queue `text` for transmission, verbatim. Input that is empty after
    /// trimming is ignored; a trigger match arms the pending-reply flag
    /// before the frame goes out. The log is not touched here; the message
    /// enters it only through its own echo.
    pub fn send(&self, text: &str) -> Result<(), ClientError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let Some(outbound) = &self.outbound else {
            return Err(ClientError::ConnectionClosed);
        };
        if mentions_bot(text) {
            self.pending_bot.store(true, Ordering::Relaxed);
        }
        outbound
            .send(Message::text(text))
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// True between sending a trigger message and the assistant's reply.
    pub fn bot_pending(&self) -> bool {
        self.pending_bot.load(Ordering::Relaxed)
    }

    /// Snapshot of the reconciled log.
    pub async fn log(&self) -> Vec<ChatMessage> {
        self.transcript.read().await.entries().to_vec()
    }

    /// Release the transport. Idempotent; also runs on drop, so every exit
    /// path from a selected-chat scope tears the socket down.
    pub fn close(&mut self) {
        if self.outbound.take().is_some() {
            debug!("closing connection to chat {}", self.chat_id);
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for ChatConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_carries_chat_id_and_token() {
        assert_eq!(
            socket_url("ws://localhost:8000", 42, "tok123"),
            "ws://localhost:8000/ws/42?token=tok123"
        );
        assert_eq!(
            socket_url("wss://chat.example.com", 7, "abc"),
            "wss://chat.example.com/ws/7?token=abc"
        );
    }
}
