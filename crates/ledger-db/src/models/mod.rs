mod user;
mod withdrawal;

pub use user::DbUser;
pub use withdrawal::DbWithdrawal;
