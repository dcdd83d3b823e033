//! Shared fixtures for unit tests.

use crate::config::Config;
use crate::notify::Notifier;
use crate::registration::RegistrationWorkflow;
use crate::stores::GateStores;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use session_store::{Clock, ManualClock};
use std::sync::{Arc, Mutex};

pub const STAFF_A: &str = "919000000001";
pub const STAFF_B: &str = "919000000002";
pub const CUSTOMER: &str = "919876543210";
pub const IP: &str = "203.0.113.7";

/// Monday 2024-03-04, 12:00 at +05:30.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 6, 30, 0).unwrap()
}

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        let mut phones: Vec<String> = self.sent().into_iter().map(|(phone, _)| phone).collect();
        phones.sort();
        phones
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, phone: &str, text: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), text.to_string()));
        true
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.venue.name = "Spice Route".into();
    config.venue.staff_phones = vec![STAFF_A.into(), STAFF_B.into()];
    config.token.secret = "k".into();
    config.storage.persist = false;
    config
}

pub struct Harness {
    pub workflow: RegistrationWorkflow,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        let clock = ManualClock::new(noon());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let notifier = Arc::new(RecordingNotifier::default());

        let stores = GateStores::in_memory(&config, shared.clone());
        let workflow =
            RegistrationWorkflow::new(&config, stores, shared, notifier.clone()).unwrap();

        Self {
            workflow,
            clock,
            notifier,
        }
    }

    pub fn sign(&self, table: &str) -> String {
        self.workflow.signer().sign(table)
    }
}
