mod user;
mod withdrawal;

pub use user::UserRepository;
pub use withdrawal::WithdrawalRepository;
