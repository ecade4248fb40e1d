//! User-facing message text. Everything is HTML; dynamic text is escaped.

use crate::keyboards;
use crate::types::Reply;
use ledger_core::error::hours_minutes;
use ledger_core::{format_bnb, BonusConfig, LedgerError, UserId, WithdrawalRequest};
use ledger_engine::{AccountSummary, Dashboard, Notice};

pub const BOT_NAME: &str = "BNB Earner Bot";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn handle(display_name: Option<&str>) -> String {
    escape(display_name.unwrap_or("no_username"))
}

pub fn welcome(channel_username: &str, content_url: Option<&str>) -> Reply {
    let text = format!(
        "👋 Welcome to <b>{}</b>\n\n\
         Before using the bot, please:\n\
         1) Join our Telegram channel: @{}\n\
         2) Subscribe to our channel\n\n\
         Tap the button below after completing both steps.",
        BOT_NAME,
        escape(channel_username)
    );
    Reply::text(text).with_keyboard(keyboards::verify(channel_username, content_url))
}

pub fn verify_first(channel_username: &str, content_url: Option<&str>) -> Reply {
    Reply::text("You must verify (join channel &amp; subscribe) before using the bot.")
        .with_keyboard(keyboards::verify(channel_username, content_url))
}

pub fn home(bonus: &BonusConfig) -> Reply {
    let text = format!(
        "🏦 <b>{}</b>\n\n\
         Daily bonus: <b>{}</b>  •  Referral bonus: <b>{}</b>\n\
         Minimum withdrawal: <b>{}</b>\n\n\
         Use the menu below.",
        BOT_NAME,
        format_bnb(bonus.daily_bonus),
        format_bnb(bonus.referral_bonus),
        format_bnb(bonus.min_withdrawal)
    );
    menu(text)
}

pub fn menu(text: impl Into<String>) -> Reply {
    Reply::text(text).with_keyboard(keyboards::main_menu())
}

pub fn account(summary: &AccountSummary, bonus: &BonusConfig) -> Reply {
    let wallet = summary
        .payout_address
        .as_deref()
        .map(escape)
        .unwrap_or_else(|| "Not set".to_string());
    let last = summary
        .last_bonus_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());
    let mut text = format!(
        "📊 <b>Your Account</b>\n\n\
         💵 Balance: <b>{}</b>\n",
        format_bnb(summary.balance)
    );
    if !summary.reserved.is_zero() {
        text.push_str(&format!(
            "⏳ Pending withdrawal: <b>{}</b>\n",
            format_bnb(summary.reserved)
        ));
    }
    text.push_str(&format!(
        "👥 Referrals: <b>{}</b>\n\
         🏦 Wallet: <code>{}</code>\n\
         ⏱ Last daily bonus: <b>{}</b>\n\n\
         Minimum withdrawal: <b>{}</b>",
        summary.referral_count,
        wallet,
        last,
        format_bnb(bonus.min_withdrawal)
    ));
    menu(text)
}

pub fn bonus_granted(bonus: &BonusConfig) -> Reply {
    menu(format!(
        "✅ You received {} as the daily bonus!",
        format_bnb(bonus.daily_bonus)
    ))
}

pub fn referral_link(bot_username: &str, user_id: UserId, bonus: &BonusConfig) -> Reply {
    menu(format!(
        "👥 <b>Referral Link</b>\nShare this and earn {} per new user:\n\n\
         <code>https://t.me/{}?start=ref{}</code>",
        format_bnb(bonus.referral_bonus),
        escape(bot_username),
        user_id
    ))
}

pub fn wallet_prompt() -> Reply {
    menu("Please send your BSC (BEP-20) wallet address (starts with <code>0x</code>).")
}

pub fn wallet_saved(address: &str) -> Reply {
    menu(format!("✅ Wallet saved: <code>{}</code>", escape(address)))
}

pub fn withdrawal_submitted() -> Reply {
    menu("✅ Withdrawal request submitted. Admin will review it shortly.")
}

pub fn approved_for_operator(request: &WithdrawalRequest) -> Reply {
    Reply::text(format!(
        "✅ Approved withdrawal ID {} for user {}, amount: {}",
        request.id,
        request.user_id,
        format_bnb(request.amount)
    ))
}

pub fn reject_reason_prompt(withdrawal_id: i64) -> Reply {
    Reply::text(format!(
        "✏️ Please type the rejection reason now. Your next message will be sent to the user (WID {}).",
        withdrawal_id
    ))
}

pub fn rejection_processed(withdrawal_id: i64) -> Reply {
    Reply::text(format!(
        "✅ Rejection processed for WID {}. User notified.",
        withdrawal_id
    ))
}

pub fn dashboard(dashboard: &Dashboard) -> Reply {
    let stats = &dashboard.stats;
    let mut text = format!(
        "📊 <b>Admin Stats</b>\n\n\
         Total users: {}\n\
         Total referrals (sum): {}\n\
         Pending withdrawals: {}\n\
         Total pending amount: {}\n",
        stats.total_users,
        stats.total_referrals,
        stats.pending_count,
        format_bnb(stats.pending_amount)
    );
    if !dashboard.pending.is_empty() {
        text.push_str("\n<b>Oldest pending</b>\n");
        for request in &dashboard.pending {
            text.push_str(&format!(
                "#{} • user {} • {} • <code>{}</code>\n",
                request.id,
                request.user_id,
                format_bnb(request.amount),
                escape(&request.address)
            ));
        }
    }
    Reply::text(text)
}

/// Message and optional keyboard for a ledger notice
pub fn notice(notice: &Notice) -> Reply {
    match notice {
        Notice::ReferralCredited { amount } => Reply::text(format!(
            "🎉 You earned {} from a referral!",
            format_bnb(*amount)
        )),
        Notice::NewUser {
            user_id,
            display_name,
        } => Reply::text(format!(
            "👤 New user started: @{} (ID: {})",
            handle(display_name.as_deref()),
            user_id
        )),
        Notice::WithdrawalRequested {
            request,
            display_name,
            referral_count,
        } => Reply::text(format!(
            "💸 <b>Withdraw Request</b>\n\
             User: @{} (ID: {})\n\
             Amount: {}\n\
             Wallet: <code>{}</code>\n\
             Referrals: {}\n\
             Withdrawal ID: {}",
            handle(display_name.as_deref()),
            request.user_id,
            format_bnb(request.amount),
            escape(&request.address),
            referral_count,
            request.id
        ))
        .with_keyboard(keyboards::decision(request.id)),
        Notice::WithdrawalApproved { amount, .. } => Reply::text(format!(
            "🎉 Your withdrawal of {} has been <b>APPROVED</b> by the admin and will be processed.",
            format_bnb(*amount)
        )),
        Notice::WithdrawalRejected {
            withdrawal_id,
            reason,
        } => Reply::text(format!(
            "❌ Your withdrawal (ID {}) was <b>REJECTED</b> by admin.\nReason: {}",
            withdrawal_id,
            escape(reason)
        )),
    }
}

/// Explanation for a refused action
pub fn refusal(err: &LedgerError, bonus: &BonusConfig) -> String {
    match err {
        LedgerError::NotVerified => {
            "You must verify (join channel &amp; subscribe) before using the bot.".to_string()
        }
        LedgerError::CooldownActive { remaining } => {
            let (hours, minutes) = hours_minutes(remaining);
            format!("⏳ Already claimed. Try again in {}h {}m.", hours, minutes)
        }
        LedgerError::BelowMinimum { balance, .. } => format!(
            "⚠️ Minimum withdrawal is {}. Your balance: {}",
            format_bnb(bonus.min_withdrawal),
            format_bnb(*balance)
        ),
        LedgerError::NoPayoutAddress => {
            "⚠️ You must set a BSC wallet first. Use the menu or send /setwallet.".to_string()
        }
        LedgerError::InvalidAddressFormat => "❌ Invalid BSC address. It should start with \
             <code>0x</code> and be 42 chars. If you used mixed-case, ensure checksum is correct."
            .to_string(),
        LedgerError::Unauthorized => "❌ You are not authorized to perform this action.".to_string(),
        LedgerError::NotFound(_) => "❌ Withdrawal not found.".to_string(),
        LedgerError::AlreadyTerminal(status) => format!("⚠️ Withdrawal already {}.", status),
        LedgerError::EmptyReason => {
            "✏️ The rejection reason cannot be empty. Please type it again.".to_string()
        }
        LedgerError::RejectSessionExpired { withdrawal_id } => format!(
            "⌛ The rejection for WID {} timed out. Press Reject again to restart it.",
            withdrawal_id
        ),
        LedgerError::StorageUnavailable(_) => {
            "⚠️ The service is busy right now. Nothing was changed, please try again.".to_string()
        }
        _ => "⚠️ Something went wrong. Nothing was changed, please try again later.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use ledger_core::WithdrawalStatus;
    use rust_decimal::Decimal;

    #[test]
    fn test_rejection_reason_is_shown_verbatim() {
        let reply = notice(&Notice::WithdrawalRejected {
            withdrawal_id: 3,
            reason: "Use <your> own wallet & retry".into(),
        });
        assert!(reply
            .text
            .ends_with("Reason: Use &lt;your&gt; own wallet &amp; retry"));
    }

    #[test]
    fn test_cooldown_text() {
        let err = LedgerError::CooldownActive {
            remaining: Duration::hours(5) + Duration::minutes(7) + Duration::seconds(59),
        };
        assert_eq!(
            refusal(&err, &BonusConfig::default()),
            "⏳ Already claimed. Try again in 5h 7m."
        );
    }

    #[test]
    fn test_amounts_are_truncated_for_display() {
        let err = LedgerError::BelowMinimum {
            balance: Decimal::new(4_999_999_9, 8),
            minimum: Decimal::new(5, 1),
        };
        assert_eq!(
            refusal(&err, &BonusConfig::default()),
            "⚠️ Minimum withdrawal is 0.5 BNB. Your balance: 0.499999 BNB"
        );
    }

    #[test]
    fn test_operator_request_notice_has_decision_buttons() {
        let request = WithdrawalRequest {
            id: 8,
            user_id: 77,
            amount: Decimal::new(5, 1),
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            rejection_reason: None,
        };
        let reply = notice(&Notice::WithdrawalRequested {
            request,
            display_name: None,
            referral_count: 3,
        });
        assert!(reply.text.contains("User: @no_username (ID: 77)"));
        assert!(reply.text.contains("Referrals: 3"));
        assert_eq!(reply.keyboard, Some(keyboards::decision(8)));
    }
}
