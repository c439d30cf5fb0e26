//! Connection-Registry – Wer ist mit welcher Verbindung online
//!
//! Haelt zwei Maps, die immer gemeinsam unter einem Lock veraendert werden:
//! - `user_zu_verbindung`: Username -> Send-Queue der aktiven Verbindung
//! - `session_zu_user`: SessionId -> Username
//!
//! Pro Username existiert genau eine aktive Verbindung. Meldet sich derselbe
//! User erneut an, wird die alte Verbindung verdraengt (nur sie bekommt
//! `another device is used`), es gibt kein Disconnect-Event.
//!
//! ## Fan-out
//! Senden ist ein nicht-blockierendes `try_send` in die Queue der
//! Verbindung. Connect/Disconnect-Events werden deshalb noch unter dem Lock
//! verteilt; eine volle oder geschlossene Queue verwirft die Nachricht.

use parking_lot::Mutex;
use parlor_core::types::{SessionId, Username};
use parlor_protocol::event::ServerEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standardgroesse der Send-Queue pro Verbindung
pub const SEND_QUEUE_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer WebSocket-Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session_id: SessionId,
    tx: mpsc::Sender<String>,
}

impl ClientSender {
    /// Erstellt ein Handle samt Empfangsseite fuer den Verbindungs-Task
    pub fn neu(session_id: SessionId, queue_groesse: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        (Self { session_id, tx }, rx)
    }

    /// Gibt `false` zurueck sobald der Verbindungs-Task beendet ist
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Reiht einen Textframe nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session = %self.session_id, "Send-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session = %self.session_id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Registrierungsergebnis
// ---------------------------------------------------------------------------

/// Ausgang von [`ConnectionRegistry::registrieren`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registrierung {
    /// User war noch nicht online, `user is connected` wurde verteilt
    Neu,
    /// Bestehende Verbindung wurde verdraengt
    Ersetzt { alte_session: SessionId },
    /// Client-Limit erreicht, nichts wurde veraendert
    Abgelehnt,
}

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Registry aller aktiven Verbindungen
///
/// Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<VerbindungsInner>>,
    /// Maximale Anzahl gleichzeitiger User (0 = unbegrenzt)
    max_clients: usize,
}

#[derive(Default)]
struct VerbindungsInner {
    user_zu_verbindung: HashMap<Username, ClientSender>,
    session_zu_user: HashMap<SessionId, Username>,
}

impl VerbindungsInner {
    /// Verteilt einen Textframe an alle offenen Verbindungen
    fn an_alle(&self, text: &str, ausgeschlossen: Option<&SessionId>) -> usize {
        self.user_zu_verbindung
            .values()
            .filter(|sender| Some(&sender.session_id) != ausgeschlossen)
            .filter(|sender| sender.ist_offen())
            .filter(|sender| sender.senden(text.to_string()))
            .count()
    }
}

/// Serialisiert ein Event; Fehler werden geloggt statt propagiert
fn event_text(event: &ServerEvent) -> Option<String> {
    match event.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(about = event.about(), fehler = %e, "Event nicht serialisierbar");
            None
        }
    }
}

impl ConnectionRegistry {
    /// Erstellt eine leere Registry ohne Client-Limit
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt eine leere Registry, die hoechstens `max_clients` User
    /// gleichzeitig aufnimmt (0 = unbegrenzt)
    pub fn mit_limit(max_clients: usize) -> Self {
        Self {
            max_clients,
            ..Self::default()
        }
    }

    /// Registriert eine Verbindung fuer einen Username
    ///
    /// Ist der User bereits online, wird seine alte Verbindung ersetzt und
    /// nur diese benachrichtigt. Sonst wird `user is connected` an alle
    /// Verbindungen verteilt, die neue eingeschlossen.
    ///
    /// Das Client-Limit wird unter demselben Lock geprueft. Eine
    /// Ersatz-Verbindung fuer einen bereits angemeldeten User zaehlt nicht
    /// dagegen.
    pub fn registrieren(&self, username: Username, sender: ClientSender) -> Registrierung {
        let mut inner = self.inner.lock();
        let neue_session = sender.session_id;

        let voll = self.max_clients != 0 && inner.user_zu_verbindung.len() >= self.max_clients;
        if voll && !inner.user_zu_verbindung.contains_key(username.as_str()) {
            tracing::warn!(
                username = %username,
                max_clients = self.max_clients,
                "Client-Limit erreicht – Verbindung abgelehnt"
            );
            return Registrierung::Abgelehnt;
        }

        if let Some(alt) = inner
            .user_zu_verbindung
            .insert(username.clone(), sender)
        {
            inner.session_zu_user.remove(&alt.session_id);
            inner.session_zu_user.insert(neue_session, username.clone());

            if let Some(text) = event_text(&ServerEvent::AnderesGeraet) {
                alt.senden(text);
            }

            tracing::info!(
                username = %username,
                alte_session = %alt.session_id,
                neue_session = %neue_session,
                "Verbindung durch anderes Geraet ersetzt"
            );
            return Registrierung::Ersetzt {
                alte_session: alt.session_id,
            };
        }

        inner.session_zu_user.insert(neue_session, username.clone());

        let event = ServerEvent::UserVerbunden {
            username: username.clone(),
        };
        if let Some(text) = event_text(&event) {
            inner.an_alle(&text, None);
        }

        tracing::info!(username = %username, session = %neue_session, "User online");
        Registrierung::Neu
    }

    /// Entfernt die Verbindung einer Session
    ///
    /// Gehoert die Session keinem User (mehr), z.B. weil sie bereits durch
    /// ein anderes Geraet verdraengt wurde, passiert nichts.
    pub fn abmelden(&self, session_id: &SessionId) -> Option<Username> {
        let mut inner = self.inner.lock();

        let username = inner.session_zu_user.remove(session_id)?;
        inner.user_zu_verbindung.remove(&username);

        let event = ServerEvent::UserGetrennt {
            username: username.clone(),
        };
        if let Some(text) = event_text(&event) {
            inner.an_alle(&text, None);
        }

        tracing::info!(username = %username, session = %session_id, "User offline");
        Some(username)
    }

    /// Sendet ein Event an alle offenen Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreich eingereihten Nachrichten zurueck.
    pub fn an_alle_senden(&self, event: &ServerEvent) -> usize {
        let Some(text) = event_text(event) else {
            return 0;
        };
        let gesendet = self.inner.lock().an_alle(&text, None);
        tracing::debug!(about = event.about(), empfaenger = gesendet, "Event verteilt");
        gesendet
    }

    /// Leitet einen Textframe unveraendert an alle ausser einer Session weiter
    pub fn an_alle_ausser_senden(&self, ausgeschlossen: &SessionId, text: &str) -> usize {
        self.inner.lock().an_alle(text, Some(ausgeschlossen))
    }

    /// Prueft ob ein User eine aktive Verbindung hat
    pub fn hat_user(&self, username: &str) -> bool {
        self.inner.lock().user_zu_verbindung.contains_key(username)
    }

    /// Gibt den Username zurueck, dem eine Session aktuell gehoert
    pub fn username_fuer_session(&self, session_id: &SessionId) -> Option<Username> {
        self.inner.lock().session_zu_user.get(session_id).cloned()
    }

    /// Alle online User, alphabetisch sortiert
    pub fn online_users(&self) -> Vec<Username> {
        let mut users: Vec<Username> = self
            .inner
            .lock()
            .user_zu_verbindung
            .keys()
            .cloned()
            .collect();
        users.sort();
        users
    }

    /// Anzahl der registrierten Verbindungen
    pub fn anzahl(&self) -> usize {
        self.inner.lock().user_zu_verbindung.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn verbindung() -> (ClientSender, mpsc::Receiver<String>) {
        ClientSender::neu(SessionId::new(), 16)
    }

    fn alle_empfangen(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut nachrichten = Vec::new();
        while let Ok(text) = rx.try_recv() {
            nachrichten.push(serde_json::from_str(&text).expect("Nachricht muss JSON sein"));
        }
        nachrichten
    }

    fn ist_konsistent(registry: &ConnectionRegistry) -> bool {
        let inner = registry.inner.lock();
        inner.user_zu_verbindung.len() == inner.session_zu_user.len()
            && inner.user_zu_verbindung.iter().all(|(user, sender)| {
                inner.session_zu_user.get(&sender.session_id) == Some(user)
            })
    }

    #[test]
    fn registrieren_verteilt_an_alle_inklusive_neuem() {
        let registry = ConnectionRegistry::neu();
        let (alice, mut rx_alice) = verbindung();
        let (bob, mut rx_bob) = verbindung();

        assert_eq!(registry.registrieren("alice".into(), alice), Registrierung::Neu);
        assert_eq!(
            alle_empfangen(&mut rx_alice),
            vec![json!({"about": "user is connected to the websocket server", "username": "alice"})]
        );

        registry.registrieren("bob".into(), bob);
        let erwartet =
            json!({"about": "user is connected to the websocket server", "username": "bob"});
        assert_eq!(alle_empfangen(&mut rx_alice), vec![erwartet.clone()]);
        assert_eq!(alle_empfangen(&mut rx_bob), vec![erwartet]);
        assert!(ist_konsistent(&registry));
    }

    #[test]
    fn erneutes_registrieren_verdraengt_ohne_disconnect_event() {
        let registry = ConnectionRegistry::neu();
        let (alt, mut rx_alt) = verbindung();
        let alte_session = alt.session_id;
        let (beobachter, mut rx_beobachter) = verbindung();
        let (neu, mut rx_neu) = verbindung();
        let neue_session = neu.session_id;

        registry.registrieren("alice".into(), alt);
        registry.registrieren("bob".into(), beobachter);
        alle_empfangen(&mut rx_alt);
        alle_empfangen(&mut rx_beobachter);

        let ergebnis = registry.registrieren("alice".into(), neu);
        assert_eq!(ergebnis, Registrierung::Ersetzt { alte_session });

        assert_eq!(
            alle_empfangen(&mut rx_alt),
            vec![json!({"about": "another device is used"})]
        );
        assert!(alle_empfangen(&mut rx_beobachter).is_empty(), "Kein Broadcast bei Verdraengung");
        assert!(alle_empfangen(&mut rx_neu).is_empty());

        assert_eq!(registry.username_fuer_session(&alte_session), None);
        assert_eq!(
            registry.username_fuer_session(&neue_session),
            Some(Username::from("alice"))
        );
        assert_eq!(registry.anzahl(), 2);
        assert!(ist_konsistent(&registry));
    }

    #[test]
    fn abmelden_verteilt_an_verbleibende() {
        let registry = ConnectionRegistry::neu();
        let (alice, _rx_alice) = verbindung();
        let session = alice.session_id;
        let (bob, mut rx_bob) = verbindung();

        registry.registrieren("alice".into(), alice);
        registry.registrieren("bob".into(), bob);
        alle_empfangen(&mut rx_bob);

        assert_eq!(registry.abmelden(&session), Some(Username::from("alice")));
        assert!(!registry.hat_user("alice"));
        assert_eq!(
            alle_empfangen(&mut rx_bob),
            vec![json!({"about": "user is disconnected from the websocket server", "username": "alice"})]
        );
        assert!(ist_konsistent(&registry));
    }

    #[test]
    fn abmelden_ist_idempotent() {
        let registry = ConnectionRegistry::neu();
        let (alice, _rx_alice) = verbindung();
        let session = alice.session_id;
        let (bob, mut rx_bob) = verbindung();

        registry.registrieren("alice".into(), alice);
        registry.registrieren("bob".into(), bob);
        registry.abmelden(&session);
        alle_empfangen(&mut rx_bob);

        assert_eq!(registry.abmelden(&session), None);
        assert!(alle_empfangen(&mut rx_bob).is_empty(), "Kein Event beim zweiten Abmelden");
    }

    #[test]
    fn abmelden_der_verdraengten_session_ist_stumm() {
        let registry = ConnectionRegistry::neu();
        let (alt, _rx_alt) = verbindung();
        let alte_session = alt.session_id;
        let (neu, mut rx_neu) = verbindung();

        registry.registrieren("alice".into(), alt);
        registry.registrieren("alice".into(), neu);
        alle_empfangen(&mut rx_neu);

        assert_eq!(registry.abmelden(&alte_session), None);
        assert!(registry.hat_user("alice"), "Neue Verbindung bleibt bestehen");
        assert!(alle_empfangen(&mut rx_neu).is_empty());
    }

    #[test]
    fn broadcast_ueberspringt_geschlossene_verbindungen() {
        let registry = ConnectionRegistry::neu();
        let (alice, rx_alice) = verbindung();
        let (bob, mut rx_bob) = verbindung();

        registry.registrieren("alice".into(), alice);
        registry.registrieren("bob".into(), bob);
        drop(rx_alice);
        alle_empfangen(&mut rx_bob);

        let gesendet = registry.an_alle_senden(&ServerEvent::KanalErstellt {
            name: "lobby".into(),
        });
        assert_eq!(gesendet, 1);
        assert_eq!(alle_empfangen(&mut rx_bob).len(), 1);
    }

    #[test]
    fn weiterleiten_schliesst_absender_aus() {
        let registry = ConnectionRegistry::neu();
        let (alice, mut rx_alice) = verbindung();
        let absender = alice.session_id;
        let (bob, mut rx_bob) = verbindung();

        registry.registrieren("alice".into(), alice);
        registry.registrieren("bob".into(), bob);
        alle_empfangen(&mut rx_alice);
        alle_empfangen(&mut rx_bob);

        let text = r#"{"about":"audio data","data":[[0.5]]}"#;
        assert_eq!(registry.an_alle_ausser_senden(&absender, text), 1);
        assert!(rx_alice.try_recv().is_err());
        assert_eq!(rx_bob.try_recv().unwrap(), text);
    }

    #[test]
    fn volle_queue_blockiert_nicht() {
        let registry = ConnectionRegistry::neu();
        let (langsam, _rx_langsam) = ClientSender::neu(SessionId::new(), 1);
        let (schnell, mut rx_schnell) = verbindung();

        registry.registrieren("langsam".into(), langsam);
        registry.registrieren("schnell".into(), schnell);
        alle_empfangen(&mut rx_schnell);

        // Queue von "langsam" ist bereits durch das eigene Connect-Event voll
        let gesendet = registry.an_alle_senden(&ServerEvent::KanalErstellt {
            name: "lobby".into(),
        });
        assert_eq!(gesendet, 1);
        assert_eq!(alle_empfangen(&mut rx_schnell).len(), 1);
    }

    #[test]
    fn online_users_sortiert() {
        let registry = ConnectionRegistry::neu();
        for name in ["carol", "alice", "bob"] {
            let (sender, _rx) = verbindung();
            registry.registrieren(name.into(), sender);
        }
        let users = registry.online_users();
        let namen: Vec<&str> = users.iter().map(|u| u.as_str()).collect();
        assert_eq!(namen, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let r1 = ConnectionRegistry::neu();
        let r2 = r1.clone();
        let (sender, _rx) = verbindung();
        r1.registrieren("shared".into(), sender);
        assert!(r2.hat_user("shared"));
    }

    #[test]
    fn limit_lehnt_neue_user_ab_aber_nicht_ersatz() {
        let registry = ConnectionRegistry::mit_limit(1);
        let (alice, _rx_alice) = verbindung();
        let (bob, mut rx_bob) = verbindung();
        let (alice_neu, _rx_alice_neu) = verbindung();

        assert_eq!(registry.registrieren("alice".into(), alice), Registrierung::Neu);
        assert_eq!(registry.registrieren("bob".into(), bob), Registrierung::Abgelehnt);
        assert!(!registry.hat_user("bob"));
        assert!(rx_bob.try_recv().is_err());

        assert!(matches!(
            registry.registrieren("alice".into(), alice_neu),
            Registrierung::Ersetzt { .. }
        ));
        assert_eq!(registry.anzahl(), 1);
        assert!(ist_konsistent(&registry));
    }

    #[test]
    fn limit_gilt_auch_bei_gleichzeitigen_anmeldungen() {
        let registry = ConnectionRegistry::mit_limit(4);
        std::thread::scope(|scope| {
            for i in 0..32 {
                let registry = registry.clone();
                scope.spawn(move || {
                    let (sender, _rx) = verbindung();
                    registry.registrieren(format!("user{i}").into(), sender);
                });
            }
        });
        assert_eq!(registry.anzahl(), 4);
        assert!(ist_konsistent(&registry));
    }
}
