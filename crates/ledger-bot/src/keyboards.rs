use crate::types::{Button, InlineKeyboard};
use ledger_core::WithdrawalId;

pub fn main_menu() -> InlineKeyboard {
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                Button::callback("💰 Claim Daily Bonus", "claim_daily"),
                Button::callback("📊 My Balance", "my_balance"),
            ],
            vec![
                Button::callback("👥 Referral Link", "referral"),
                Button::callback("💳 Set/Update Wallet", "set_wallet"),
            ],
            vec![
                Button::callback("💵 Withdraw", "withdraw"),
                Button::callback("🏠 Main Menu", "main_menu"),
            ],
        ],
    }
}

/// Join the channel, open the external content, then ask for the check
pub fn verify(channel_username: &str, content_url: Option<&str>) -> InlineKeyboard {
    let mut rows = vec![vec![Button::link(
        "🔗 Open Channel",
        format!("https://t.me/{}", channel_username),
    )]];
    if let Some(url) = content_url {
        rows.push(vec![Button::link("▶️ Subscribe", url)]);
    }
    rows.push(vec![Button::callback(
        "✅ I Joined & Subscribed (Check)",
        "check_both",
    )]);
    InlineKeyboard {
        inline_keyboard: rows,
    }
}

/// Operator buttons attached to a new withdrawal request
pub fn decision(withdrawal_id: WithdrawalId) -> InlineKeyboard {
    InlineKeyboard {
        inline_keyboard: vec![
            vec![
                Button::callback("✅ Approve", format!("approve:{}", withdrawal_id)),
                Button::callback("❌ Reject", format!("reject:{}", withdrawal_id)),
            ],
            vec![Button::callback("🏠 Main Menu", "main_menu")],
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_without_content_url() {
        let keyboard = verify("mychannel", None);
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(
            keyboard.inline_keyboard[0][0].url.as_deref(),
            Some("https://t.me/mychannel")
        );
    }

    #[test]
    fn test_decision_callbacks() {
        let keyboard = decision(12);
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row[0].callback_data.as_deref(), Some("approve:12"));
        assert_eq!(row[1].callback_data.as_deref(), Some("reject:12"));
    }
}
