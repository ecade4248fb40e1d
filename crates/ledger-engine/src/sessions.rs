use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ledger_core::{UserId, WithdrawalId};

/// An operator's declared intent to reject one withdrawal, waiting for a reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectSession {
    pub withdrawal_id: WithdrawalId,
    pub expires_at: DateTime<Utc>,
}

impl RejectSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Short-lived reject sessions keyed by operator. One per operator; a newer
/// intent replaces the older one.
#[derive(Debug)]
pub struct RejectSessions {
    sessions: DashMap<UserId, RejectSession>,
    ttl: Duration,
}

impl RejectSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Returns the session this one replaced, if any
    pub fn open(
        &self,
        operator: UserId,
        withdrawal_id: WithdrawalId,
        now: DateTime<Utc>,
    ) -> Option<RejectSession> {
        self.sessions.insert(
            operator,
            RejectSession {
                withdrawal_id,
                expires_at: now + self.ttl,
            },
        )
    }

    pub fn peek(&self, operator: UserId) -> Option<RejectSession> {
        self.sessions.get(&operator).map(|s| *s)
    }

    pub fn take(&self, operator: UserId) -> Option<RejectSession> {
        self.sessions.remove(&operator).map(|(_, s)| s)
    }

    /// Drop any session that points at `withdrawal_id`
    pub fn discard_for(&self, withdrawal_id: WithdrawalId) {
        self.sessions.retain(|_, s| s.withdrawal_id != withdrawal_id);
    }

    /// Remove expired sessions, returning how many were dropped
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_intent_replaces_older() {
        let sessions = RejectSessions::new(Duration::minutes(10));
        let now = Utc::now();
        assert!(sessions.open(1, 7, now).is_none());
        let replaced = sessions.open(1, 8, now).unwrap();
        assert_eq!(replaced.withdrawal_id, 7);
        assert_eq!(sessions.take(1).unwrap().withdrawal_id, 8);
        assert!(sessions.take(1).is_none());
    }

    #[test]
    fn test_expiry_and_purge() {
        let sessions = RejectSessions::new(Duration::minutes(10));
        let now = Utc::now();
        sessions.open(1, 7, now);
        sessions.open(2, 9, now + Duration::minutes(5));

        let later = now + Duration::minutes(10);
        assert!(sessions.peek(1).unwrap().is_expired(later));
        assert!(!sessions.peek(2).unwrap().is_expired(later));

        assert_eq!(sessions.purge_expired(later), 1);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_discard_for_withdrawal() {
        let sessions = RejectSessions::new(Duration::minutes(10));
        sessions.open(1, 7, Utc::now());
        sessions.discard_for(7);
        assert!(sessions.is_empty());
    }
}
