use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Platform identity of a user (Telegram user id)
pub type UserId = i64;

/// Ledger row for a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
    /// Total accrued balance, including any amount held for pending withdrawals
    pub balance: Decimal,
    /// Portion of `balance` held by pending withdrawals (0 <= reserved <= balance)
    pub reserved: Decimal,
    pub referral_count: i64,
    pub referred_by: Option<UserId>,
    pub payout_address: Option<String>,
    pub last_bonus_at: Option<DateTime<Utc>>,
    pub joined_channel: bool,
    pub confirmed_subscription: bool,
}

/// Defaults applied when a user row is created lazily
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub display_name: Option<String>,
    pub referred_by: Option<UserId>,
}

/// Point updates that do not touch balance or cooldown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserField {
    DisplayName(Option<String>),
    PayoutAddress(Option<String>),
    JoinedChannel(bool),
    ConfirmedSubscription(bool),
}

impl User {
    pub fn new(id: UserId, defaults: &NewUser) -> Self {
        Self {
            id,
            display_name: defaults.display_name.clone(),
            balance: Decimal::ZERO,
            reserved: Decimal::ZERO,
            referral_count: 0,
            referred_by: defaults.referred_by,
            payout_address: None,
            last_bonus_at: None,
            joined_channel: false,
            confirmed_subscription: false,
        }
    }

    /// Joined the channel and confirmed the external subscription
    pub fn is_verified(&self) -> bool {
        self.joined_channel && self.confirmed_subscription
    }

    /// Balance not held by a pending withdrawal
    pub fn available(&self) -> Decimal {
        self.balance - self.reserved
    }

    pub fn apply_field(&mut self, field: UserField) {
        match field {
            UserField::DisplayName(name) => self.display_name = name,
            UserField::PayoutAddress(address) => self.payout_address = address,
            UserField::JoinedChannel(joined) => self.joined_channel = joined,
            UserField::ConfirmedSubscription(confirmed) => self.confirmed_subscription = confirmed,
        }
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<()> {
        if amount.is_sign_negative() {
            return Err(LedgerError::Invariant(format!(
                "negative credit {} for user {}",
                amount, self.id
            )));
        }
        self.balance += amount;
        Ok(())
    }

    /// Place a hold on part of the available balance
    pub fn reserve(&mut self, amount: Decimal) -> Result<()> {
        if amount.is_sign_negative() || amount > self.available() {
            return Err(LedgerError::Invariant(format!(
                "cannot hold {} for user {} with {} available",
                amount,
                self.id,
                self.available()
            )));
        }
        self.reserved += amount;
        Ok(())
    }

    /// Return a held amount to the available balance
    pub fn release(&mut self, amount: Decimal) -> Result<()> {
        if amount > self.reserved {
            return Err(LedgerError::Invariant(format!(
                "cannot release {} for user {} holding {}",
                amount, self.id, self.reserved
            )));
        }
        self.reserved -= amount;
        Ok(())
    }

    /// Pay out a held amount: debits both the hold and the balance
    pub fn consume(&mut self, amount: Decimal) -> Result<()> {
        if amount > self.reserved || amount > self.balance {
            return Err(LedgerError::Invariant(format!(
                "cannot debit {} for user {} holding {} of {}",
                amount, self.id, self.reserved, self.balance
            )));
        }
        self.reserved -= amount;
        self.balance -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_hold_lifecycle_keeps_balance_non_negative() {
        let mut user = User::new(7, &NewUser::default());
        user.credit(dec("0.5")).unwrap();
        user.reserve(dec("0.5")).unwrap();
        assert_eq!(user.available(), Decimal::ZERO);

        // A referral lands while the hold is open
        user.credit(dec("0.01")).unwrap();
        assert_eq!(user.available(), dec("0.01"));

        user.consume(dec("0.5")).unwrap();
        assert_eq!(user.balance, dec("0.01"));
        assert_eq!(user.reserved, Decimal::ZERO);
    }

    #[test]
    fn test_cannot_hold_more_than_available() {
        let mut user = User::new(7, &NewUser::default());
        user.credit(dec("0.2")).unwrap();
        assert!(matches!(user.reserve(dec("0.3")), Err(LedgerError::Invariant(_))));
        assert!(matches!(user.consume(dec("0.1")), Err(LedgerError::Invariant(_))));
        assert!(matches!(user.credit(dec("-1")), Err(LedgerError::Invariant(_))));
        assert_eq!(user.balance, dec("0.2"));
    }

    #[test]
    fn test_verified_needs_both_flags() {
        let mut user = User::new(1, &NewUser::default());
        user.apply_field(UserField::JoinedChannel(true));
        assert!(!user.is_verified());
        user.apply_field(UserField::ConfirmedSubscription(true));
        assert!(user.is_verified());
    }
}
