mod stats;
mod user;
mod withdrawal;

pub use stats::LedgerStats;
pub use user::{NewUser, User, UserField, UserId};
pub use withdrawal::{WithdrawalId, WithdrawalOutcome, WithdrawalRequest, WithdrawalStatus};
