//! Test doubles for the collaborator ports.

use crate::ports::{MembershipCheck, MembershipStatus, Notice, Notifier, PortError};
use async_trait::async_trait;
use ledger_core::UserId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Records every notice; can be switched to fail every send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(UserId, Notice)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(UserId, Notice)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, to: UserId) -> Vec<Notice> {
        self.sent
            .lock()
            .iter()
            .filter(|(recipient, _)| *recipient == to)
            .map(|(_, notice)| notice.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, to: UserId, notice: &Notice) -> Result<(), PortError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PortError("chat unreachable".to_string()));
        }
        self.sent.lock().push((to, notice.clone()));
        Ok(())
    }
}

/// Membership lookup that answers the same status for everyone
#[derive(Debug)]
pub struct FixedMembership(pub Result<MembershipStatus, PortError>);

#[async_trait]
impl MembershipCheck for FixedMembership {
    async fn membership(&self, _user_id: UserId) -> Result<MembershipStatus, PortError> {
        self.0.clone()
    }
}
