//! Balance mutations: referral credits, the daily bonus and verification.
//!
//! Every balance or cooldown write goes through [`LedgerStore::modify_user`],
//! so check-and-set happens against a locked row.

use crate::clock::Clock;
use crate::ports::{deliver, MembershipStatus, Notice, Notifier};
use crate::record_refusal;
use chrono::{DateTime, Utc};
use ledger_core::{
    validate_address, BonusConfig, LedgerError, LedgerStore, NewUser, Result, User, UserField,
    UserId,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

/// Result of a user's first (or repeated) interaction
#[derive(Debug, Clone, PartialEq)]
pub struct Onboarding {
    pub user: User,
    /// The row did not exist before this call
    pub created: bool,
    /// The referrer this interaction credited, if any
    pub credited_referrer: Option<UserId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusGrant {
    pub amount: Decimal,
    pub balance: Decimal,
    pub granted_at: DateTime<Utc>,
}

/// Read-only account projection for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSummary {
    pub balance: Decimal,
    /// Portion of `balance` held by pending withdrawals
    pub reserved: Decimal,
    pub referral_count: i64,
    pub payout_address: Option<String>,
    pub last_bonus_at: Option<DateTime<Utc>>,
    pub verified: bool,
}

impl AccountSummary {
    pub fn available(&self) -> Decimal {
        self.balance - self.reserved
    }
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            balance: user.balance,
            reserved: user.reserved,
            referral_count: user.referral_count,
            payout_address: user.payout_address.clone(),
            last_bonus_at: user.last_bonus_at,
            verified: user.is_verified(),
        }
    }
}

pub struct BalanceLedger {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    bonus: BonusConfig,
    operator_id: UserId,
}

impl BalanceLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        bonus: BonusConfig,
        operator_id: UserId,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            bonus,
            operator_id,
        }
    }

    pub fn bonus(&self) -> &BonusConfig {
        &self.bonus
    }

    /// Create the user on first interaction and credit a valid referrer once.
    ///
    /// A self-referral is dropped. A repeated call never credits again because
    /// only the call that creates the row may credit.
    pub async fn onboard(
        &self,
        user_id: UserId,
        display_name: Option<String>,
        referrer: Option<UserId>,
    ) -> Result<Onboarding> {
        let referrer = referrer.filter(|r| *r != user_id);
        let defaults = NewUser {
            display_name: display_name.clone(),
            referred_by: referrer,
        };
        let created = self.store.upsert_user(user_id, &defaults).await?;

        let mut credited_referrer = None;
        if created {
            info!(user_id, referrer = ?referrer, "New user onboarded");
            if let Some(referrer) = referrer {
                // Independent of the new row; a failure here is logged, not surfaced
                match self
                    .credit_referral(referrer, self.bonus.referral_bonus)
                    .await
                {
                    Ok(_) => credited_referrer = Some(referrer),
                    Err(e) => {
                        error!(user_id, referrer, error = %e, "Referral credit failed")
                    }
                }
            }
            deliver(
                self.notifier.as_ref(),
                self.operator_id,
                Notice::NewUser {
                    user_id,
                    display_name,
                },
            )
            .await;
        }

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;
        Ok(Onboarding {
            user,
            created,
            credited_referrer,
        })
    }

    /// Add `amount` to the referrer and bump their referral count in one write
    pub async fn credit_referral(&self, referrer: UserId, amount: Decimal) -> Result<User> {
        self.store.upsert_user(referrer, &NewUser::default()).await?;
        let user = self
            .store
            .modify_user(referrer, &move |u: &mut User| -> Result<()> {
                u.credit(amount)?;
                u.referral_count += 1;
                Ok(())
            })
            .await?;

        ledger_metrics::counters::referral_credited();
        info!(
            referrer,
            amount = %amount,
            referral_count = user.referral_count,
            "Referral credited"
        );
        deliver(
            self.notifier.as_ref(),
            referrer,
            Notice::ReferralCredited { amount },
        )
        .await;
        Ok(user)
    }

    /// Record the external membership check and the self-reported subscription.
    ///
    /// Flags are only written when the membership check passes.
    pub async fn verify(&self, user_id: UserId, membership: MembershipStatus) -> Result<User> {
        if !membership.is_member() {
            return Err(record_refusal(user_id, LedgerError::NotVerified));
        }
        self.store.upsert_user(user_id, &NewUser::default()).await?;
        self.store
            .update_user_field(user_id, UserField::JoinedChannel(true))
            .await?;
        let user = self
            .store
            .update_user_field(user_id, UserField::ConfirmedSubscription(true))
            .await?;
        info!(user_id, "User verified");
        Ok(user)
    }

    pub async fn is_verified(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(|u| u.is_verified())
            .unwrap_or(false))
    }

    /// Validate and store a payout address, returning the canonical form
    pub async fn set_payout_address(&self, user_id: UserId, raw: &str) -> Result<String> {
        let address = validate_address(raw).map_err(|e| record_refusal(user_id, e))?;
        self.store.upsert_user(user_id, &NewUser::default()).await?;
        self.store
            .update_user_field(user_id, UserField::PayoutAddress(Some(address.clone())))
            .await?;
        info!(user_id, address = %address, "Payout address saved");
        Ok(address)
    }

    /// Grant the daily bonus, at most once per cooldown window
    pub async fn claim_daily_bonus(&self, user_id: UserId) -> Result<BonusGrant> {
        let now = self.clock.now();
        let amount = self.bonus.daily_bonus;
        let cooldown = self.bonus.cooldown;

        let result = self
            .store
            .modify_user(user_id, &move |u: &mut User| -> Result<()> {
                if !u.is_verified() {
                    return Err(LedgerError::NotVerified);
                }
                if let Some(last) = u.last_bonus_at {
                    let elapsed = now - last;
                    if elapsed < cooldown {
                        return Err(LedgerError::CooldownActive {
                            remaining: cooldown - elapsed,
                        });
                    }
                }
                u.credit(amount)?;
                u.last_bonus_at = Some(now);
                Ok(())
            })
            .await;

        let user = match result {
            Ok(user) => user,
            // A user without a row has not verified yet
            Err(LedgerError::UserNotFound(_)) => {
                return Err(record_refusal(user_id, LedgerError::NotVerified))
            }
            Err(e) => return Err(record_refusal(user_id, e)),
        };

        ledger_metrics::counters::bonus_claimed();
        info!(user_id, amount = %amount, balance = %user.balance, "Daily bonus granted");
        Ok(BonusGrant {
            amount,
            balance: user.balance,
            granted_at: now,
        })
    }

    /// Current balance; zero for a user who has never interacted
    pub async fn get_balance(&self, user_id: UserId) -> Result<Decimal> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(|u| u.balance)
            .unwrap_or(Decimal::ZERO))
    }

    pub async fn get_summary(&self, user_id: UserId) -> Result<AccountSummary> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(|u| AccountSummary::from(&u))
            .unwrap_or_default())
    }
}
