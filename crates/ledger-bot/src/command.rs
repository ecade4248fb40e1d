//! Parsing of slash commands and callback data.

use ledger_core::{UserId, WithdrawalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start` with an optional referrer from the deep-link token
    Start { referrer: Option<UserId> },
    Balance,
    Claim,
    SetWallet,
    Withdraw,
    Referral,
    AdminStats,
    Unknown(String),
}

impl Command {
    /// `None` unless `text` starts with `/`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let head = parts.next().unwrap_or_default();
        // `/start@MyBot` in group chats
        let name = head.split('@').next().unwrap_or_default();

        Some(match name {
            "start" => Command::Start {
                referrer: parts.next().and_then(parse_ref_token),
            },
            "balance" => Command::Balance,
            "claim" => Command::Claim,
            "setwallet" => Command::SetWallet,
            "withdraw" => Command::Withdraw,
            "referral" => Command::Referral,
            "admin_stats" => Command::AdminStats,
            other => Command::Unknown(other.to_string()),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Balance => "balance",
            Command::Claim => "claim",
            Command::SetWallet => "setwallet",
            Command::Withdraw => "withdraw",
            Command::Referral => "referral",
            Command::AdminStats => "admin_stats",
            Command::Unknown(_) => "unknown",
        }
    }
}

/// Referral deep-link token: `ref<id>` or `ref=<id>` with a positive id.
/// Anything else is ignored.
pub fn parse_ref_token(token: &str) -> Option<UserId> {
    let token = token.trim();
    let id = token
        .strip_prefix("ref=")
        .or_else(|| token.strip_prefix("ref"))?;
    id.parse::<UserId>().ok().filter(|id| *id > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    CheckBoth,
    MainMenu,
    ClaimDaily,
    MyBalance,
    Referral,
    SetWallet,
    Withdraw,
    Approve(WithdrawalId),
    Reject(WithdrawalId),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "check_both" => Some(Callback::CheckBoth),
            "main_menu" => Some(Callback::MainMenu),
            "claim_daily" => Some(Callback::ClaimDaily),
            "my_balance" => Some(Callback::MyBalance),
            "referral" => Some(Callback::Referral),
            "set_wallet" => Some(Callback::SetWallet),
            "withdraw" => Some(Callback::Withdraw),
            _ => {
                let (action, id) = data.split_once(':')?;
                let id = id.parse().ok()?;
                match action {
                    "approve" => Some(Callback::Approve(id)),
                    "reject" => Some(Callback::Reject(id)),
                    _ => None,
                }
            }
        }
    }
}
