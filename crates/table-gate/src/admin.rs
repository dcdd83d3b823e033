//! Staff actions and read-only views over the gate's state.

use crate::error::GateError;
use crate::notify::broadcast;
use crate::registration::RegistrationWorkflow;
use serde::Serialize;
use session_store::{Session, SessionStatus};
use tracing::{info, instrument};
use whatsapp_client::mask_phone;

/// One row of the floor view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStatus {
    pub table: String,
    /// Session status, or "FREE"
    pub status: String,
    /// Masked phone of the seated customer
    pub phone: Option<String>,
    /// Venue-local time the session started
    pub since: Option<String>,
}

impl RegistrationWorkflow {
    /// Move a pending session to ORDERING and tell the customer and staff.
    #[instrument(skip(self, phone), fields(phone = %mask_phone(phone)))]
    pub async fn approve(&self, phone: &str) -> Result<Session, GateError> {
        let phone = self.canonical_phone(phone);

        let session = {
            let _admission = self.admission.lock().await;

            let session = self.sessions.get(&phone).await.ok_or(GateError::NotFound)?;
            if session.status != SessionStatus::PendingApproval {
                return Err(GateError::NotPending(session.status));
            }

            self.sessions.set_status(&phone, SessionStatus::Ordering).await?;
            Session {
                status: SessionStatus::Ordering,
                ..session
            }
        };

        info!(table = %session.table, "Session approved");

        let customer_text = self.messages.customer_approved(&session.table);
        let staff_text = self.messages.staff_approved(&session.table, &phone);
        tokio::join!(
            self.notifier.send_message(&phone, &customer_text),
            broadcast(&self.notifier, &self.policy.staff_phones, &staff_text),
        );

        Ok(session)
    }

    /// Cancel a pending session staff could not verify and tell the customer.
    #[instrument(skip(self, phone), fields(phone = %mask_phone(phone)))]
    pub async fn reject(&self, phone: &str) -> Result<(), GateError> {
        let phone = self.canonical_phone(phone);

        {
            let _admission = self.admission.lock().await;

            let session = self.sessions.get(&phone).await.ok_or(GateError::NotFound)?;
            if session.status != SessionStatus::PendingApproval {
                return Err(GateError::NotPending(session.status));
            }
            self.sessions.set_status(&phone, SessionStatus::Cancelled).await?;
        }
        info!("Session rejected");

        self.notifier
            .send_message(&phone, &self.messages.customer_rejected())
            .await;
        Ok(())
    }

    /// Block a number, cancelling any open session. Returns whether one was cancelled.
    pub async fn block(&self, phone: &str) -> Result<bool, GateError> {
        let phone = self.canonical_phone(phone);
        let _admission = self.admission.lock().await;
        Ok(self.blocklist.block(&phone).await?)
    }

    pub async fn unblock(&self, phone: &str) -> Result<(), GateError> {
        let phone = self.canonical_phone(phone);
        Ok(self.blocklist.unblock(&phone).await?)
    }

    pub async fn blocked(&self) -> Vec<String> {
        self.blocklist.list().await
    }

    /// Check a customer out. `Ok(false)` if the phone is unknown.
    pub async fn end_session(&self, phone: &str) -> Result<bool, GateError> {
        let phone = self.canonical_phone(phone);
        Ok(self.sessions.end_session(&phone).await?)
    }

    /// Set a status by name, e.g. "PAID" from the ordering system.
    pub async fn set_status(&self, phone: &str, status: &str) -> Result<bool, GateError> {
        let status: SessionStatus = status.parse().map_err(GateError::InvalidStatus)?;
        let phone = self.canonical_phone(phone);
        Ok(self.sessions.set_status(&phone, status).await?)
    }

    pub async fn list_active(&self) -> Vec<Session> {
        self.sessions.list_active().await
    }

    /// Every table with its live session, if any.
    pub async fn table_status(&self) -> Vec<TableStatus> {
        let mut rows = Vec::with_capacity(self.policy.total_tables as usize);

        for table in self.policy.tables() {
            let row = match self.sessions.get_by_table(&table).await {
                Some(session) => TableStatus {
                    status: session.status.to_string(),
                    phone: Some(mask_phone(&session.phone)),
                    since: Some(self.messages.local_time(session.created_at)),
                    table,
                },
                None => TableStatus {
                    table,
                    status: "FREE".to_string(),
                    phone: None,
                    since: None,
                },
            };
            rows.push(row);
        }

        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;
    use crate::stores::GateStores;
    use crate::testing::{noon, test_config, Harness, CUSTOMER, IP, STAFF_A, STAFF_B};
    use mockall::predicate::{always, eq};
    use session_store::{Clock, ManualClock};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_approve_notifies_customer_and_staff() {
        let config = test_config();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(noon()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send_message()
            .with(eq(CUSTOMER), always())
            .times(1)
            .returning(|_, _| true);
        for staff in [STAFF_A, STAFF_B] {
            notifier
                .expect_send_message()
                .with(eq(staff), eq("✅ Approved: 9198xxxxx210 at T3"))
                .times(1)
                .returning(|_, _| false);
        }

        let stores = GateStores::in_memory(&config, clock.clone());
        stores.sessions.create(CUSTOMER, "T3", false).await.unwrap();
        let workflow = RegistrationWorkflow::new(&config, stores, clock, Arc::new(notifier)).unwrap();

        let session = workflow.approve(CUSTOMER).await.unwrap();
        assert_eq!(session.status, SessionStatus::Ordering);
        assert_eq!(
            workflow.sessions().get(CUSTOMER).await.unwrap().status,
            SessionStatus::Ordering
        );
    }

    #[tokio::test]
    async fn test_approve_requires_pending() {
        let h = Harness::new(test_config());

        assert!(matches!(
            h.workflow.approve(CUSTOMER).await,
            Err(GateError::NotFound)
        ));

        h.workflow
            .register("T1", "9876543210", &h.sign("T1"), IP)
            .await
            .unwrap();
        h.workflow.approve(CUSTOMER).await.unwrap();

        assert!(matches!(
            h.workflow.approve(CUSTOMER).await,
            Err(GateError::NotPending(SessionStatus::Ordering))
        ));
    }

    #[tokio::test]
    async fn test_reject_cancels_and_frees_table() {
        let h = Harness::new(test_config());
        let sig = h.sign("T1");
        h.workflow.register("T1", "9876543210", &sig, IP).await.unwrap();
        h.notifier.clear();

        h.workflow.reject(CUSTOMER).await.unwrap();

        assert!(h.workflow.sessions().get(CUSTOMER).await.is_none());
        assert_eq!(h.notifier.recipients(), vec![CUSTOMER]);
        assert!(matches!(
            h.workflow.reject("919111111111").await,
            Err(GateError::NotFound)
        ));

        let next = h
            .workflow
            .register("T1", "9123456780", &sig, "198.51.100.2")
            .await
            .unwrap();
        assert_eq!(next.session.table, "T1");
    }

    #[tokio::test]
    async fn test_reject_requires_pending_live_session() {
        let h = Harness::new(test_config());
        h.workflow.sessions().create(CUSTOMER, "T2", true).await.unwrap();

        assert!(matches!(
            h.workflow.reject(CUSTOMER).await,
            Err(GateError::NotPending(SessionStatus::Ordering))
        ));

        h.workflow.end_session(CUSTOMER).await.unwrap();
        assert!(matches!(
            h.workflow.reject(CUSTOMER).await,
            Err(GateError::NotFound)
        ));
        assert_eq!(
            h.workflow.sessions().record(CUSTOMER).await.unwrap().status,
            SessionStatus::CheckedOut
        );
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_set_status_by_name() {
        let h = Harness::new(test_config());
        h.workflow.sessions().create(CUSTOMER, "T2", true).await.unwrap();

        assert!(h.workflow.set_status(CUSTOMER, "paid").await.unwrap());
        assert!(!h.workflow.set_status("919111111111", "PAID").await.unwrap());
        assert!(matches!(
            h.workflow.set_status(CUSTOMER, "LOST").await,
            Err(GateError::InvalidStatus(_))
        ));

        // Paid sessions outlive their expiry.
        h.clock.advance(chrono::Duration::hours(5));
        assert_eq!(h.workflow.list_active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_end_session() {
        let h = Harness::new(test_config());
        h.workflow.sessions().create(CUSTOMER, "T2", true).await.unwrap();

        assert!(h.workflow.end_session("9876543210").await.unwrap());
        assert!(h.workflow.list_active().await.is_empty());
        assert_eq!(
            h.workflow.sessions().record(CUSTOMER).await.unwrap().status,
            SessionStatus::CheckedOut
        );
    }

    #[tokio::test]
    async fn test_block_and_unblock_normalize_phone() {
        let h = Harness::new(test_config());

        assert!(!h.workflow.block("098765 43210").await.unwrap());
        assert_eq!(h.workflow.blocked().await, vec![CUSTOMER]);

        h.workflow.unblock("9876543210").await.unwrap();
        assert!(h.workflow.blocked().await.is_empty());
    }

    #[tokio::test]
    async fn test_table_status() {
        let h = Harness::new(test_config());
        h.workflow.sessions().create(CUSTOMER, "T3", false).await.unwrap();

        let rows = h.workflow.table_status().await;
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].status, "FREE");
        assert_eq!(rows[0].phone, None);
        assert_eq!(
            rows[2],
            TableStatus {
                table: "T3".into(),
                status: "PENDING_APPROVAL".into(),
                phone: Some("9198xxxxx210".into()),
                since: Some("04/03/2024, 12:00 pm".into()),
            }
        );
    }
}
