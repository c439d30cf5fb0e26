//! Channel-Registry – Voice-Kanaele und ihre Mitglieder
//!
//! Bidirektional indiziert, beide Maps liegen hinter einem gemeinsamen Lock:
//! - `kanal_zu_usern`: Kanalname -> Menge der Mitglieder
//! - `user_zu_kanal`: Username -> der eine Kanal, in dem der User ist
//!
//! Invariante: `u ∈ kanal_zu_usern[k]` genau dann wenn `user_zu_kanal[u] == k`.
//! Leere Kanaele bleiben bestehen bis sie explizit entfernt werden.
//!
//! ## Ablauf einer Operation
//! 1. User-Existenz in der `ConnectionRegistry` pruefen (eigener Lock)
//! 2. Kanal-Lock nehmen, restliche Vorbedingungen pruefen, mutieren
//! 3. Lock freigeben, bei Erfolg genau ein Event an alle verteilen
//!
//! Die beiden Registries werden nie gleichzeitig gesperrt. Ein User kann
//! sich zwischen Schritt 1 und 2 trennen; das wird bewusst hingenommen.

use parking_lot::Mutex;
use parlor_core::types::{ChannelName, Username};
use parlor_protocol::control::ChannelInfo;
use parlor_protocol::event::ServerEvent;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::connections::ConnectionRegistry;
use crate::error::KanalFehler;

/// Ausgang eines erfolgreichen [`ChannelRegistry::beitreten`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Beitritt {
    /// User war in keinem Kanal
    Neu,
    /// User war in einem anderen Kanal und wurde verschoben
    Gewechselt { von: ChannelName },
    /// User war bereits Mitglied, nichts geaendert
    BereitsMitglied,
}

/// Registry aller Voice-Kanaele
///
/// Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<Mutex<KanalInner>>,
}

#[derive(Default)]
struct KanalInner {
    kanal_zu_usern: HashMap<ChannelName, HashSet<Username>>,
    user_zu_kanal: HashMap<Username, ChannelName>,
}

impl KanalInner {
    /// Entfernt einen User aus seinem aktuellen Kanal, falls vorhanden
    fn austragen(&mut self, username: &Username) -> Option<ChannelName> {
        let kanal = self.user_zu_kanal.remove(username)?;
        if let Some(mitglieder) = self.kanal_zu_usern.get_mut(&kanal) {
            mitglieder.remove(username);
        }
        Some(kanal)
    }

    fn eintragen(&mut self, username: &Username, kanal: &ChannelName) {
        if let Some(mitglieder) = self.kanal_zu_usern.get_mut(kanal) {
            mitglieder.insert(username.clone());
            self.user_zu_kanal.insert(username.clone(), kanal.clone());
        }
    }
}

impl ChannelRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt einen leeren Kanal an
    pub fn erstellen(
        &self,
        name: &ChannelName,
        verbindungen: &ConnectionRegistry,
    ) -> Result<(), KanalFehler> {
        {
            let mut inner = self.inner.lock();
            if inner.kanal_zu_usern.contains_key(name) {
                return Err(KanalFehler::BereitsVorhanden);
            }
            inner.kanal_zu_usern.insert(name.clone(), HashSet::new());
        }

        tracing::info!(kanal = %name, "Voice-Kanal erstellt");
        verbindungen.an_alle_senden(&ServerEvent::KanalErstellt { name: name.clone() });
        Ok(())
    }

    /// Entfernt einen Kanal und loest die Zuordnung aller Mitglieder
    ///
    /// Es wird nur `voice channel is removed` verteilt, keine Leave-Events
    /// pro Mitglied.
    pub fn entfernen(
        &self,
        name: &ChannelName,
        verbindungen: &ConnectionRegistry,
    ) -> Result<(), KanalFehler> {
        let mitglieder = {
            let mut inner = self.inner.lock();
            let mitglieder = inner
                .kanal_zu_usern
                .remove(name)
                .ok_or(KanalFehler::KanalNichtGefunden)?;
            for user in &mitglieder {
                inner.user_zu_kanal.remove(user);
            }
            mitglieder
        };

        tracing::info!(kanal = %name, mitglieder = mitglieder.len(), "Voice-Kanal entfernt");
        verbindungen.an_alle_senden(&ServerEvent::KanalEntfernt { name: name.clone() });
        Ok(())
    }

    /// Fuegt einen User einem Kanal hinzu
    ///
    /// Ist der User schon in einem anderen Kanal, wird er von dort
    /// verschoben und es wird ein einziges `user switched` verteilt.
    pub fn beitreten(
        &self,
        username: &Username,
        kanal: &ChannelName,
        verbindungen: &ConnectionRegistry,
    ) -> Result<Beitritt, KanalFehler> {
        if !verbindungen.hat_user(username.as_str()) {
            return Err(KanalFehler::UserNichtGefunden);
        }

        let beitritt = {
            let mut inner = self.inner.lock();
            if !inner.kanal_zu_usern.contains_key(kanal) {
                return Err(KanalFehler::KanalNichtGefunden);
            }

            match inner.user_zu_kanal.get(username).cloned() {
                Some(aktuell) if &aktuell == kanal => Beitritt::BereitsMitglied,
                Some(_) => {
                    let von = inner.austragen(username);
                    inner.eintragen(username, kanal);
                    match von {
                        Some(von) => Beitritt::Gewechselt { von },
                        None => Beitritt::Neu,
                    }
                }
                None => {
                    inner.eintragen(username, kanal);
                    Beitritt::Neu
                }
            }
        };

        let event = match &beitritt {
            Beitritt::Neu => ServerEvent::KanalBeigetreten {
                username: username.clone(),
                channel_name: kanal.clone(),
            },
            Beitritt::Gewechselt { von } => ServerEvent::KanalGewechselt {
                username: username.clone(),
                old_channel_name: von.clone(),
                new_channel_name: kanal.clone(),
            },
            Beitritt::BereitsMitglied => {
                tracing::debug!(username = %username, kanal = %kanal, "User bereits im Kanal");
                return Ok(beitritt);
            }
        };

        tracing::info!(username = %username, kanal = %kanal, "User Kanal beigetreten");
        verbindungen.an_alle_senden(&event);
        Ok(beitritt)
    }

    /// Entfernt einen User aus einem Kanal
    ///
    /// Die Zuordnung des Users wird nur geloescht, wenn sie auf genau diesen
    /// Kanal zeigt. Das Event wird bei Erfolg immer verteilt.
    pub fn verlassen(
        &self,
        username: &Username,
        kanal: &ChannelName,
        verbindungen: &ConnectionRegistry,
    ) -> Result<(), KanalFehler> {
        if !verbindungen.hat_user(username.as_str()) {
            return Err(KanalFehler::UserNichtGefunden);
        }

        {
            let mut inner = self.inner.lock();
            if !inner.kanal_zu_usern.contains_key(kanal) {
                return Err(KanalFehler::KanalNichtGefunden);
            }
            if inner.user_zu_kanal.get(username) == Some(kanal) {
                inner.austragen(username);
            } else {
                tracing::debug!(username = %username, kanal = %kanal, "User war nicht im Kanal");
            }
        }

        tracing::info!(username = %username, kanal = %kanal, "User Kanal verlassen");
        verbindungen.an_alle_senden(&ServerEvent::KanalVerlassen {
            username: username.clone(),
            channel_name: kanal.clone(),
        });
        Ok(())
    }

    /// Entfernt einen User aus seinem aktuellen Kanal (Disconnect-Pfad)
    ///
    /// Ohne Kanal-Zuordnung passiert nichts und es wird kein Event verteilt.
    pub fn aktuellen_verlassen(
        &self,
        username: &Username,
        verbindungen: &ConnectionRegistry,
    ) -> Option<ChannelName> {
        if !verbindungen.hat_user(username.as_str()) {
            return None;
        }

        let kanal = self.inner.lock().austragen(username)?;

        tracing::info!(username = %username, kanal = %kanal, "User beim Trennen aus Kanal entfernt");
        verbindungen.an_alle_senden(&ServerEvent::KanalVerlassen {
            username: username.clone(),
            channel_name: kanal.clone(),
        });
        Some(kanal)
    }

    /// Verschiebt einen User atomar von `alt` nach `neu`
    pub fn wechseln(
        &self,
        username: &Username,
        alt: &ChannelName,
        neu: &ChannelName,
        verbindungen: &ConnectionRegistry,
    ) -> Result<(), KanalFehler> {
        if !verbindungen.hat_user(username.as_str()) {
            return Err(KanalFehler::UserNichtGefunden);
        }

        {
            let mut inner = self.inner.lock();
            if !inner.kanal_zu_usern.contains_key(alt) {
                return Err(KanalFehler::AlterKanalNichtGefunden);
            }
            if !inner.kanal_zu_usern.contains_key(neu) {
                return Err(KanalFehler::NeuerKanalNichtGefunden);
            }
            match inner.user_zu_kanal.get(username) {
                None => return Err(KanalFehler::InKeinemKanal),
                Some(aktuell) if aktuell != alt => {
                    return Err(KanalFehler::NichtImAltenKanal {
                        aktuell: aktuell.clone(),
                    });
                }
                Some(_) => {}
            }
            inner.austragen(username);
            inner.eintragen(username, neu);
        }

        tracing::info!(username = %username, von = %alt, zu = %neu, "User Kanal gewechselt");
        verbindungen.an_alle_senden(&ServerEvent::KanalGewechselt {
            username: username.clone(),
            old_channel_name: alt.clone(),
            new_channel_name: neu.clone(),
        });
        Ok(())
    }

    /// Konsistente Momentaufnahme aller Kanaele, nach Namen sortiert
    pub fn snapshot(&self) -> Vec<ChannelInfo> {
        let inner = self.inner.lock();
        let mut kanaele: Vec<ChannelInfo> = inner
            .kanal_zu_usern
            .iter()
            .map(|(name, mitglieder)| {
                let mut users: Vec<Username> = mitglieder.iter().cloned().collect();
                users.sort();
                ChannelInfo {
                    name: name.clone(),
                    users,
                }
            })
            .collect();
        kanaele.sort_by(|a, b| a.name.cmp(&b.name));
        kanaele
    }

    /// Gibt den aktuellen Kanal eines Users zurueck
    pub fn kanal_von_user(&self, username: &str) -> Option<ChannelName> {
        self.inner.lock().user_zu_kanal.get(username).cloned()
    }

    /// Anzahl der existierenden Kanaele
    pub fn kanal_anzahl(&self) -> usize {
        self.inner.lock().kanal_zu_usern.len()
    }

    /// Anzahl der User, die einem Kanal zugeordnet sind
    pub fn mitglieder_anzahl(&self) -> usize {
        self.inner.lock().user_zu_kanal.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
