//! Admission pipeline: can this phone start a session at this table now?

use crate::availability::{AvailabilityGate, Schedule};
use crate::blocklist::BlocklistManager;
use crate::config::{chrono_duration, Config};
use crate::error::{GateError, RateScope, Rejection};
use crate::messages::Messages;
use crate::notify::{broadcast, Notifier};
use crate::phone::PhoneFormat;
use crate::rate_limit::{ip_key, phone_key, RateLimiter};
use crate::stores::GateStores;
use crate::token::TokenSigner;
use anyhow::{anyhow, Result};
use chrono::Duration;
use serde::Serialize;
use session_store::{Clock, Session, SessionStatus, SessionStore};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use whatsapp_client::mask_phone;

/// Venue rules the pipeline enforces.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub total_tables: u32,
    pub table_prefix: String,
    pub auto_approve: bool,
    pub staff_phones: Vec<String>,
    pub scan_limit: u32,
    pub scan_window: Duration,
    pub registration_limit: u32,
    pub registration_window: Duration,
}

impl AdmissionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            total_tables: config.venue.total_tables,
            table_prefix: config.venue.table_prefix.clone(),
            auto_approve: config.venue.auto_approve,
            staff_phones: config.venue.staff_phones.clone(),
            scan_limit: config.rate_limit.scans_per_ip,
            scan_window: chrono_duration(config.rate_limit.scan_window),
            registration_limit: config.rate_limit.registrations_per_phone,
            registration_window: chrono_duration(config.rate_limit.registration_window),
        }
    }

    /// Table number if `table` names one of this venue's tables.
    pub fn table_number(&self, table: &str) -> Option<u32> {
        let number: u32 = table.strip_prefix(&self.table_prefix)?.parse().ok()?;
        (1..=self.total_tables).contains(&number).then_some(number)
    }

    /// "T1" through "T{total_tables}".
    pub fn tables(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.total_tables).map(|n| format!("{}{}", self.table_prefix, n))
    }
}

/// What a successful registration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationAction {
    /// The phone already had a live session
    Existing,
    /// Created, waiting for staff
    Pending,
    /// Created and ordering
    Approved,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub action: RegistrationAction,
    pub session: Session,
    pub message: String,
}

/// Why a phone may not order right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidReason {
    Blocked,
    Closed,
    NoSession,
    PendingApproval,
}

#[derive(Debug, Clone)]
pub enum Validation {
    Valid(Session),
    Invalid {
        reason: InvalidReason,
        message: String,
    },
}

/// Wires the signer, limiter, gate, blocklist and session store together.
pub struct RegistrationWorkflow {
    pub(crate) signer: TokenSigner,
    pub(crate) limiter: RateLimiter,
    pub(crate) gate: AvailabilityGate,
    pub(crate) blocklist: BlocklistManager,
    pub(crate) sessions: SessionStore,
    pub(crate) phone_format: PhoneFormat,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) messages: Messages,
    pub(crate) policy: AdmissionPolicy,
    /// Held from the final blocklist and occupancy checks through session
    /// creation, and by staff actions that change who may hold a session.
    pub(crate) admission: Mutex<()>,
}

impl RegistrationWorkflow {
    pub fn new(
        config: &Config,
        stores: GateStores,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let signer = TokenSigner::new(config.token.secret.as_bytes())
            .map_err(|e| anyhow!("Invalid token secret: {}", e))?;
        let schedule = Schedule::from_config(&config.hours)?;
        let messages = Messages::new(&config.venue.name, config.hours_label(), schedule.offset);

        Ok(Self {
            signer,
            limiter: stores.limiter,
            gate: AvailabilityGate::new(schedule, clock),
            blocklist: stores.blocklist,
            sessions: stores.sessions,
            phone_format: PhoneFormat::from(&config.phone),
            notifier,
            messages,
            policy: AdmissionPolicy::from_config(config),
            admission: Mutex::new(()),
        })
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Normalized form of a phone given on an admin or bot route; falls back
    /// to the bare digits when it does not fit the configured format.
    pub fn canonical_phone(&self, raw: &str) -> String {
        self.phone_format
            .normalize(raw)
            .unwrap_or_else(|| raw.chars().filter(char::is_ascii_digit).collect())
    }

    fn closed(&self) -> Rejection {
        Rejection::Closed {
            hours: self.messages.hours().to_string(),
        }
    }

    /// Token, table range, opening hours and IP budget.
    ///
    /// This is where a QR scan spends the caller's IP allowance.
    #[instrument(skip(self, signature))]
    pub async fn scan(&self, table: &str, signature: &str, ip: &str) -> Result<(), Rejection> {
        if !self.signer.verify(table, signature) {
            return Err(Rejection::InvalidToken);
        }

        if self.policy.table_number(table).is_none() {
            return Err(Rejection::InvalidTable);
        }

        if !self.gate.is_open() {
            return Err(self.closed());
        }

        let decision = self
            .limiter
            .check(&ip_key(ip), self.policy.scan_limit, self.policy.scan_window)
            .await;
        if !decision.allowed {
            return Err(Rejection::RateLimited(RateScope::Ip));
        }

        Ok(())
    }

    /// Run the full admission pipeline and, if it passes, start a session.
    ///
    /// Checks short-circuit in a fixed order. Notifications go out after
    /// every lock is released and never affect the outcome.
    #[instrument(skip(self, phone, signature), fields(phone = %mask_phone(phone)))]
    pub async fn register(
        &self,
        table: &str,
        phone: &str,
        signature: &str,
        ip: &str,
    ) -> Result<Registration, GateError> {
        let result = self.admit(table, phone, signature, ip).await;

        match &result {
            Ok(registration) => info!(action = ?registration.action, "Registration accepted"),
            Err(GateError::Rejected(rejection)) => {
                info!(code = rejection.code(), "Registration declined")
            }
            Err(_) => {}
        }

        result
    }

    async fn admit(
        &self,
        table: &str,
        phone: &str,
        signature: &str,
        ip: &str,
    ) -> Result<Registration, GateError> {
        let (table, phone, signature) = (table.trim(), phone.trim(), signature.trim());
        if table.is_empty() || phone.is_empty() || signature.is_empty() {
            return Err(Rejection::MissingFields.into());
        }

        self.scan(table, signature, ip).await?;

        let phone = self
            .phone_format
            .normalize(phone)
            .ok_or(Rejection::InvalidPhone {
                national_length: self.phone_format.national_length,
            })?;

        if self.blocklist.is_blocked(&phone).await {
            return Err(Rejection::Blocked.into());
        }

        let decision = self
            .limiter
            .check(
                &phone_key(&phone),
                self.policy.registration_limit,
                self.policy.registration_window,
            )
            .await;
        if !decision.allowed {
            return Err(Rejection::RateLimited(RateScope::Phone).into());
        }

        let session = {
            let _admission = self.admission.lock().await;

            // A block may have landed while this request waited for the lock.
            if self.blocklist.is_blocked(&phone).await {
                return Err(Rejection::Blocked.into());
            }

            if let Some(existing) = self.sessions.get(&phone).await {
                debug!(table = %existing.table, "Phone already seated");
                return Ok(Registration {
                    action: RegistrationAction::Existing,
                    message: self.messages.registration_existing(&existing.table),
                    session: existing,
                });
            }

            if self.sessions.get_by_table(table).await.is_some() {
                return Err(Rejection::TableOccupied {
                    table: table.to_string(),
                }
                .into());
            }

            self.sessions
                .create(&phone, table, self.policy.auto_approve)
                .await?
        };

        if self.policy.auto_approve {
            self.notifier
                .send_message(&phone, &self.messages.customer_active(table))
                .await;

            return Ok(Registration {
                action: RegistrationAction::Approved,
                session,
                message: self.messages.registration_started().to_string(),
            });
        }

        let staff_text = self.messages.staff_request(table, &phone, session.created_at);
        let customer_text = self.messages.customer_pending(table);
        tokio::join!(
            broadcast(&self.notifier, &self.policy.staff_phones, &staff_text),
            self.notifier.send_message(&phone, &customer_text),
        );

        Ok(Registration {
            action: RegistrationAction::Pending,
            session,
            message: self.messages.registration_pending().to_string(),
        })
    }

    /// Whether `phone` may place orders right now.
    ///
    /// A valid session has its `last_activity` refreshed.
    #[instrument(skip(self, phone), fields(phone = %mask_phone(phone)))]
    pub async fn validate(&self, phone: &str) -> Result<Validation, GateError> {
        let phone = self.canonical_phone(phone);

        let invalid = |reason, message: &str| Validation::Invalid {
            reason,
            message: message.to_string(),
        };

        if self.blocklist.is_blocked(&phone).await {
            return Ok(invalid(InvalidReason::Blocked, self.messages.validate_blocked()));
        }

        if !self.gate.is_open() {
            return Ok(invalid(InvalidReason::Closed, &self.messages.validate_closed()));
        }

        let Some(session) = self.sessions.get(&phone).await else {
            return Ok(invalid(InvalidReason::NoSession, self.messages.validate_no_session()));
        };

        if session.status == SessionStatus::PendingApproval {
            return Ok(invalid(InvalidReason::PendingApproval, self.messages.validate_pending()));
        }

        match self.sessions.touch(&phone).await? {
            Some(session) => Ok(Validation::Valid(session)),
            None => Ok(invalid(InvalidReason::NoSession, self.messages.validate_no_session())),
        }
    }
}
