//! Withdrawal state machine: `pending -> approved` or `pending -> rejected(reason)`.
//!
//! A request holds its snapshot amount from creation. Approval debits exactly
//! that amount; rejection releases it.

use crate::clock::Clock;
use crate::ports::{deliver, Notice, Notifier};
use crate::record_refusal;
use crate::sessions::{RejectSession, RejectSessions};
use ledger_core::{
    LedgerError, LedgerStats, LedgerStore, Result, User, UserId, WithdrawalId,
    WithdrawalOutcome, WithdrawalRequest, WithdrawalStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Pending requests plus the aggregate summary for the admin view
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub pending: Vec<WithdrawalRequest>,
    pub stats: LedgerStats,
}

pub struct WithdrawalWorkflow {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    sessions: RejectSessions,
    operator_id: UserId,
    min_withdrawal: Decimal,
}

impl WithdrawalWorkflow {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        sessions: RejectSessions,
        operator_id: UserId,
        min_withdrawal: Decimal,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            sessions,
            operator_id,
            min_withdrawal,
        }
    }

    pub fn operator_id(&self) -> UserId {
        self.operator_id
    }

    pub fn is_operator(&self, actor: UserId) -> bool {
        actor == self.operator_id
    }

    pub fn sessions(&self) -> &RejectSessions {
        &self.sessions
    }

    /// Drop reject intents whose reason never arrived
    pub fn purge_expired_sessions(&self) -> usize {
        let purged = self.sessions.purge_expired(self.clock.now());
        ledger_metrics::gauges::set_reject_sessions(self.sessions.len());
        if purged > 0 {
            debug!(purged, "Expired reject sessions purged");
        }
        purged
    }

    fn authorize(&self, actor: UserId) -> Result<()> {
        if self.is_operator(actor) {
            Ok(())
        } else {
            Err(record_refusal(actor, LedgerError::Unauthorized))
        }
    }

    /// Snapshot the available balance and payout address into a new pending
    /// request and hold that amount.
    pub async fn request_withdrawal(&self, user_id: UserId) -> Result<WithdrawalRequest> {
        let minimum = self.min_withdrawal;
        let check = move |u: &User| -> Result<(Decimal, String)> {
            if !u.is_verified() {
                return Err(LedgerError::NotVerified);
            }
            let available = u.available();
            // Nothing to hold means nothing to pay out, whatever the minimum
            if available <= Decimal::ZERO || available < minimum {
                return Err(LedgerError::BelowMinimum {
                    balance: available,
                    minimum,
                });
            }
            let address = u
                .payout_address
                .clone()
                .ok_or(LedgerError::NoPayoutAddress)?;
            Ok((available, address))
        };

        let request = match self.store.open_withdrawal(user_id, &check).await {
            Ok(request) => request,
            Err(LedgerError::UserNotFound(_)) => {
                return Err(record_refusal(user_id, LedgerError::NotVerified))
            }
            Err(e) => return Err(record_refusal(user_id, e)),
        };

        ledger_metrics::counters::withdrawal_requested();
        info!(
            user_id,
            withdrawal_id = request.id,
            amount = %request.amount,
            "Withdrawal requested"
        );

        // Triage context only; the request itself is already committed
        let (display_name, referral_count) = match self.store.get_user(user_id).await {
            Ok(Some(user)) => (user.display_name, user.referral_count),
            _ => (None, 0),
        };
        deliver(
            self.notifier.as_ref(),
            self.operator_id,
            Notice::WithdrawalRequested {
                request: request.clone(),
                display_name,
                referral_count,
            },
        )
        .await;

        Ok(request)
    }

    pub async fn approve(&self, id: WithdrawalId, actor: UserId) -> Result<WithdrawalRequest> {
        self.authorize(actor)?;
        let (request, user) = self
            .store
            .settle_withdrawal(id, &WithdrawalOutcome::Approved)
            .await
            .map_err(|e| record_refusal(actor, e))?;
        self.sessions.discard_for(id);

        ledger_metrics::counters::withdrawal_approved();
        info!(
            withdrawal_id = id,
            user_id = request.user_id,
            amount = %request.amount,
            balance = %user.balance,
            "Withdrawal approved"
        );
        deliver(
            self.notifier.as_ref(),
            request.user_id,
            Notice::WithdrawalApproved {
                withdrawal_id: id,
                amount: request.amount,
            },
        )
        .await;
        Ok(request)
    }

    /// Reject with a non-empty reason, which is forwarded to the user verbatim
    pub async fn reject(
        &self,
        id: WithdrawalId,
        actor: UserId,
        reason: &str,
    ) -> Result<WithdrawalRequest> {
        self.authorize(actor)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(record_refusal(actor, LedgerError::EmptyReason));
        }

        let outcome = WithdrawalOutcome::Rejected {
            reason: reason.to_string(),
        };
        let (request, user) = self
            .store
            .settle_withdrawal(id, &outcome)
            .await
            .map_err(|e| record_refusal(actor, e))?;
        self.sessions.discard_for(id);

        ledger_metrics::counters::withdrawal_rejected();
        info!(
            withdrawal_id = id,
            user_id = request.user_id,
            available = %user.available(),
            "Withdrawal rejected"
        );
        deliver(
            self.notifier.as_ref(),
            request.user_id,
            Notice::WithdrawalRejected {
                withdrawal_id: id,
                reason: reason.to_string(),
            },
        )
        .await;
        Ok(request)
    }

    /// First phase of a rejection: remember which request the operator's next
    /// message is the reason for. Replaces any earlier intent.
    pub async fn begin_reject(&self, id: WithdrawalId, actor: UserId) -> Result<RejectSession> {
        self.authorize(actor)?;
        let request = self
            .store
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| record_refusal(actor, LedgerError::NotFound(id)))?;
        if request.status != WithdrawalStatus::Pending {
            return Err(record_refusal(
                actor,
                LedgerError::AlreadyTerminal(request.status),
            ));
        }

        let now = self.clock.now();
        if let Some(previous) = self.sessions.open(actor, id, now) {
            if previous.withdrawal_id != id {
                debug!(
                    abandoned = previous.withdrawal_id,
                    withdrawal_id = id,
                    "Reject intent replaced, earlier request stays pending"
                );
            }
        }
        ledger_metrics::gauges::set_reject_sessions(self.sessions.len());

        self.sessions
            .peek(actor)
            .ok_or_else(|| LedgerError::Invariant("reject session vanished".to_string()))
    }

    /// Second phase of a rejection. `Ok(None)` means the actor has no open
    /// session and the text is an ordinary message.
    pub async fn submit_reject_reason(
        &self,
        actor: UserId,
        reason: &str,
    ) -> Result<Option<WithdrawalRequest>> {
        if !self.is_operator(actor) {
            return Ok(None);
        }
        let Some(session) = self.sessions.peek(actor) else {
            return Ok(None);
        };
        if session.is_expired(self.clock.now()) {
            self.sessions.take(actor);
            ledger_metrics::gauges::set_reject_sessions(self.sessions.len());
            return Err(record_refusal(
                actor,
                LedgerError::RejectSessionExpired {
                    withdrawal_id: session.withdrawal_id,
                },
            ));
        }
        // An empty reason keeps the session open for another try
        if reason.trim().is_empty() {
            return Err(record_refusal(actor, LedgerError::EmptyReason));
        }

        self.sessions.take(actor);
        ledger_metrics::gauges::set_reject_sessions(self.sessions.len());
        self.reject(session.withdrawal_id, actor, reason)
            .await
            .map(Some)
    }

    /// Pending requests, oldest first
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        self.store.list_pending_withdrawals(limit).await
    }

    pub async fn dashboard(&self, actor: UserId, limit: usize) -> Result<Dashboard> {
        self.authorize(actor)?;
        let pending = self.store.list_pending_withdrawals(limit).await?;
        let stats = self.store.stats().await?;
        Ok(Dashboard { pending, stats })
    }
}
