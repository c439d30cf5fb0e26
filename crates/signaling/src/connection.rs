//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Socket wird geteilt:
//! - Writer-Task: leert die Send-Queue (`ClientSender`) und Steuer-Frames in den Sink
//! - Lese-Schleife: Textframes an den `MessageDispatcher`, Keepalive, Shutdown
//!
//! ## Lebenszyklus
//! ```text
//! Upgrade -> registrieren -> Lese-Schleife -> Close einreihen -> Kanal verlassen -> abmelden
//! ```
//!
//! Lehnt die Registry die Anmeldung ab (Client-Limit), wird der Socket mit
//! `1013` geschlossen, bevor ein Task gestartet wird.
//!
//! Wird die Verbindung durch ein anderes Geraet verdraengt, gibt die
//! Registry ihren `ClientSender` frei. Der Writer leert die Queue (inkl.
//! `another device is used`) und schliesst den Socket.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Ohne eingehenden Frame fuer `leerlauf_timeout_sek` wird getrennt

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parlor_core::types::{SessionId, Username};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::connections::{ClientSender, Registrierung};
use crate::dispatcher::MessageDispatcher;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;
use crate::ws::close_senden;

/// Wie lange auf den Writer gewartet wird, bevor er abgebrochen wird
const WRITER_NACHLAUF: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Verbindungsende
// ---------------------------------------------------------------------------

/// Warum die Lese-Schleife beendet wurde
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ende {
    /// Client hat geschlossen oder der Stream ist zu Ende
    ClientGetrennt,
    /// Writer-Task ist beendet (verdraengt oder Sendefehler)
    WriterBeendet,
    /// Leerlauf-Timeout
    Timeout,
    /// Server faehrt herunter
    Shutdown,
    /// Transport- oder Protokollfehler
    Fehler,
}

impl Ende {
    /// Close-Frame den der Server noch senden soll
    fn close_frame(&self) -> Option<CloseFrame<'static>> {
        let (code, grund) = match self {
            Self::ClientGetrennt | Self::WriterBeendet => return None,
            Self::Timeout => (close_code::AWAY, "idle timeout"),
            Self::Shutdown => (close_code::AWAY, "server is shutting down"),
            Self::Fehler => (close_code::ERROR, "unexpected error"),
        };
        Some(CloseFrame {
            code,
            reason: Cow::Borrowed(grund),
        })
    }
}

// ---------------------------------------------------------------------------
// ClientConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    session_id: SessionId,
    username: Username,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer Session-ID
    pub fn neu(state: Arc<SignalingState>, username: Username) -> Self {
        Self {
            state,
            session_id: SessionId::new(),
            username,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Danach ist der User aus Kanal und Registry entfernt.
    pub async fn verarbeiten(self, socket: WebSocket) {
        let session_id = self.session_id;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.state.config.leerlauf_timeout_sek);
        let mut shutdown_rx = self.state.shutdown_empfaenger();

        let (sender, sende_rx) =
            ClientSender::neu(session_id, self.state.config.send_queue_groesse);
        let registrierung = self
            .state
            .verbindungen
            .registrieren(self.username.clone(), sender);
        if registrierung == Registrierung::Abgelehnt {
            close_senden(socket, close_code::AGAIN, "The server is full.").await;
            return;
        }

        // Events seit der Registrierung liegen bereits in der Send-Queue
        let (ws_tx, mut ws_rx) = socket.split();
        let (steuer_tx, steuer_rx) = mpsc::channel::<Message>(8);
        let mut writer = tokio::spawn(writer_task(ws_tx, sende_rx, steuer_rx, session_id));

        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));

        let mut letzter_empfang = Instant::now();
        let mut keepalive = tokio::time::interval(keepalive_intervall);
        // Erster Tick kommt sofort
        keepalive.tick().await;

        let ende = loop {
            tokio::select! {
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            match nachricht {
                                Message::Text(text) => {
                                    dispatcher.dispatch(&session_id, &text);
                                }
                                Message::Binary(daten) => {
                                    tracing::warn!(
                                        session = %session_id,
                                        bytes = daten.len(),
                                        "Binaerframe verworfen"
                                    );
                                }
                                Message::Ping(_) | Message::Pong(_) => {
                                    tracing::trace!(session = %session_id, "Keepalive-Frame empfangen");
                                }
                                Message::Close(frame) => {
                                    tracing::debug!(session = %session_id, frame = ?frame, "Client schliesst");
                                    break Ende::ClientGetrennt;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            let fehler = SignalingError::from(e);
                            tracing::warn!(session = %session_id, fehler = %fehler, "WebSocket-Lesefehler");
                            break Ende::Fehler;
                        }
                        None => break Ende::ClientGetrennt,
                    }
                }

                ergebnis = &mut writer => {
                    match ergebnis {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(session = %session_id, fehler = %e, "Writer-Task beendet");
                        }
                        Err(e) => {
                            tracing::error!(session = %session_id, fehler = %e, "Writer-Task abgebrochen");
                        }
                    }
                    break Ende::WriterBeendet;
                }

                _ = keepalive.tick() => {
                    if letzter_empfang.elapsed() > timeout_dauer {
                        tracing::warn!(session = %session_id, "Verbindungs-Timeout");
                        break Ende::Timeout;
                    }
                    if steuer_tx.try_send(Message::Ping(Vec::new())).is_err() {
                        tracing::debug!(session = %session_id, "Ping nicht einreihbar");
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(session = %session_id, "Shutdown-Signal – Verbindung wird getrennt");
                        break Ende::Shutdown;
                    }
                }
            }
        };

        // Vor dem Abmelden einreihen, sonst sieht der Writer eine Verdraengung
        if let Some(frame) = ende.close_frame() {
            let einreihen = steuer_tx.send(Message::Close(Some(frame)));
            if !matches!(tokio::time::timeout(WRITER_NACHLAUF, einreihen).await, Ok(Ok(()))) {
                tracing::debug!(session = %session_id, "Close-Frame nicht einreihbar");
            }
        }
        drop(steuer_tx);

        dispatcher.client_cleanup(&session_id);

        if ende != Ende::WriterBeendet
            && tokio::time::timeout(WRITER_NACHLAUF, &mut writer).await.is_err()
        {
            writer.abort();
        }

        tracing::info!(
            session = %session_id,
            username = %self.username,
            ende = ?ende,
            "Verbindungs-Task beendet"
        );
    }
}

/// Schreibt Queue-Inhalte und Steuer-Frames in den Socket
///
/// Steuer-Frames haben Vorrang. Ein Close-Frame beendet den Writer, ebenso
/// eine geschlossene Send-Queue (Verbindung wurde verdraengt).
async fn writer_task(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut sende_rx: mpsc::Receiver<String>,
    mut steuer_rx: mpsc::Receiver<Message>,
    session_id: SessionId,
) -> SignalingResult<()> {
    loop {
        tokio::select! {
            biased;

            steuer = steuer_rx.recv() => {
                let Some(nachricht) = steuer else {
                    break;
                };
                let ist_close = matches!(nachricht, Message::Close(_));
                ws_tx.send(nachricht).await?;
                if ist_close {
                    break;
                }
            }

            text = sende_rx.recv() => {
                match text {
                    Some(text) => ws_tx.send(Message::Text(text)).await?,
                    None => {
                        tracing::debug!(session = %session_id, "Send-Queue freigegeben – Verbindung verdraengt");
                        ws_tx
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::NORMAL,
                                reason: Cow::Borrowed("another device is used"),
                            })))
                            .await?;
                        break;
                    }
                }
            }
        }
    }

    // Nach einem Close-Frame meldet der Sink ggf. bereits "geschlossen"
    if let Err(e) = ws_tx.close().await {
        tracing::trace!(session = %session_id, fehler = %e, "Sink bereits geschlossen");
    }
    Ok(())
}
