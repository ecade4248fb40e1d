//! Routes inbound updates to the ledger and answers in chat.
//!
//! Free text is resolved in priority order: an operator's open reject session,
//! then a pending wallet prompt, then the menu.

use crate::api::ChatApi;
use crate::command::{Callback, Command};
use crate::error::Result;
use crate::messenger::Messenger;
use crate::render;
use crate::types::{CallbackQuery, Message, Reply, TgUser, Update};
use dashmap::DashSet;
use ledger_core::{LedgerError, TelegramConfig, UserId};
use ledger_engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const DASHBOARD_LIMIT: usize = 10;

pub struct Dispatcher {
    engine: Arc<Engine>,
    api: Arc<dyn ChatApi>,
    messenger: Messenger,
    membership: Arc<dyn ledger_engine::MembershipCheck>,
    telegram: TelegramConfig,
    awaiting_wallet: DashSet<UserId>,
    bot_username: OnceCell<String>,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<Engine>,
        api: Arc<dyn ChatApi>,
        membership: Arc<dyn ledger_engine::MembershipCheck>,
        telegram: TelegramConfig,
    ) -> Self {
        let messenger = Messenger::new(
            api.clone(),
            Duration::from_secs(telegram.message_ttl_secs),
        );
        Self {
            engine,
            api,
            messenger,
            membership,
            telegram,
            awaiting_wallet: DashSet::new(),
            bot_username: OnceCell::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn handle(&self, update: Update) -> Result<()> {
        if let Some(query) = update.callback_query {
            ledger_metrics::counters::update_received("callback");
            return self.on_callback(query).await;
        }
        if let Some(message) = update.message {
            ledger_metrics::counters::update_received("message");
            return self.on_message(message).await;
        }
        ledger_metrics::counters::update_received("other");
        debug!(update_id = update.update_id, "Ignoring update without message");
        Ok(())
    }

    async fn on_message(&self, message: Message) -> Result<()> {
        let (Some(from), Some(text)) = (message.from, message.text) else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        match Command::parse(&text) {
            Some(command) => {
                debug!(user_id = from.id, command = command.kind(), "Command");
                self.on_command(chat_id, &from, command).await
            }
            None => self.on_text(chat_id, from.id, &text).await,
        }
    }

    async fn on_command(&self, chat_id: i64, from: &TgUser, command: Command) -> Result<()> {
        let user_id = from.id;
        match command {
            Command::Start { referrer } => self.start(chat_id, from, referrer).await,
            Command::Balance => self.show_account(chat_id, user_id).await,
            Command::Claim => self.claim(chat_id, user_id).await,
            Command::SetWallet => self.prompt_wallet(chat_id, user_id).await,
            Command::Withdraw => self.withdraw(chat_id, user_id).await,
            Command::Referral => self.referral(chat_id, user_id).await,
            Command::AdminStats => self.admin_stats(chat_id, user_id).await,
            Command::Unknown(_) => self.fallback(chat_id, user_id).await,
        }
    }

    async fn on_callback(&self, query: CallbackQuery) -> Result<()> {
        if let Err(e) = self.api.answer_callback_query(&query.id).await {
            debug!(error = %e, "Callback answer failed");
        }
        let user_id = query.from.id;
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(user_id);
        let message_id = query.message.as_ref().map(|m| m.message_id);

        let Some(callback) = query.data.as_deref().and_then(Callback::parse) else {
            debug!(user_id, data = ?query.data, "Unknown callback data");
            return Ok(());
        };

        match callback {
            Callback::CheckBoth => self.check_both(chat_id, message_id, user_id).await,
            Callback::MainMenu => self.send(chat_id, &self.home()).await,
            Callback::ClaimDaily => self.claim(chat_id, user_id).await,
            Callback::MyBalance => self.show_account(chat_id, user_id).await,
            Callback::Referral => self.referral(chat_id, user_id).await,
            Callback::SetWallet => self.prompt_wallet(chat_id, user_id).await,
            Callback::Withdraw => self.withdraw(chat_id, user_id).await,
            Callback::Approve(id) => {
                let reply = match self.engine.workflow.approve(id, user_id).await {
                    Ok(request) => render::approved_for_operator(&request),
                    Err(e) => Reply::text(self.explain(&e)),
                };
                self.edit_or_send(chat_id, message_id, &reply).await
            }
            Callback::Reject(id) => {
                let reply = match self.engine.workflow.begin_reject(id, user_id).await {
                    Ok(session) => render::reject_reason_prompt(session.withdrawal_id),
                    Err(e) => Reply::text(self.explain(&e)),
                };
                self.edit_or_send(chat_id, message_id, &reply).await
            }
        }
    }

    async fn on_text(&self, chat_id: i64, user_id: UserId, text: &str) -> Result<()> {
        match self
            .engine
            .workflow
            .submit_reject_reason(user_id, text)
            .await
        {
            Ok(Some(request)) => {
                return self
                    .send(chat_id, &render::rejection_processed(request.id))
                    .await
            }
            Ok(None) => {}
            Err(e) => return self.refuse(chat_id, e).await,
        }

        if self.awaiting_wallet.remove(&user_id).is_some() {
            return match self.engine.ledger.set_payout_address(user_id, text).await {
                Ok(address) => self.send(chat_id, &render::wallet_saved(&address)).await,
                Err(e) => self.refuse(chat_id, e).await,
            };
        }

        self.fallback(chat_id, user_id).await
    }

    async fn start(&self, chat_id: i64, from: &TgUser, referrer: Option<UserId>) -> Result<()> {
        let onboarding = match self
            .engine
            .ledger
            .onboard(from.id, from.display_name(), referrer)
            .await
        {
            Ok(onboarding) => onboarding,
            Err(e) => return self.refuse(chat_id, e).await,
        };

        let reply = if onboarding.user.is_verified() {
            self.home()
        } else {
            render::welcome(&self.telegram.channel_username, self.content_url())
        };
        self.send(chat_id, &reply).await
    }

    async fn check_both(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        user_id: UserId,
    ) -> Result<()> {
        let status = match self.membership.membership(user_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(user_id, error = %e, "Channel membership check failed");
                let reply = Reply::text(
                    "⚠️ Could not verify channel membership. Make sure the channel is public \
                     or add the bot as admin.",
                );
                return self.edit_or_send(chat_id, message_id, &reply).await;
            }
        };

        match self.engine.ledger.verify(user_id, status).await {
            Ok(_) => {
                let done = Reply::text("✅ Verification complete, main menu sent.");
                self.edit_or_send(chat_id, message_id, &done).await?;
                self.send(chat_id, &self.home()).await
            }
            Err(LedgerError::NotVerified) => {
                let reply = Reply::text(
                    "❌ You are not a member yet. Please join the channel and press the button again.",
                );
                self.edit_or_send(chat_id, message_id, &reply).await
            }
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    async fn show_account(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        match self.engine.ledger.get_summary(user_id).await {
            Ok(summary) if summary.verified => {
                let reply = render::account(&summary, self.engine.ledger.bonus());
                self.send(chat_id, &reply).await
            }
            Ok(_) => self.refuse(chat_id, LedgerError::NotVerified).await,
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    async fn claim(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        match self.engine.ledger.claim_daily_bonus(user_id).await {
            Ok(_) => {
                let reply = render::bonus_granted(self.engine.ledger.bonus());
                self.send(chat_id, &reply).await
            }
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    async fn prompt_wallet(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        self.awaiting_wallet.insert(user_id);
        self.send(chat_id, &render::wallet_prompt()).await
    }

    async fn withdraw(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        match self.engine.workflow.request_withdrawal(user_id).await {
            Ok(_) => self.send(chat_id, &render::withdrawal_submitted()).await,
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    async fn referral(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        let username = self
            .bot_username
            .get_or_try_init(|| async {
                let me = self.api.get_me().await?;
                info!(bot_id = me.id, username = ?me.username, "Resolved bot identity");
                Ok::<_, crate::BotError>(me.username.unwrap_or_default())
            })
            .await?;
        let reply = render::referral_link(username, user_id, self.engine.ledger.bonus());
        self.send(chat_id, &reply).await
    }

    async fn admin_stats(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        match self
            .engine
            .workflow
            .dashboard(user_id, DASHBOARD_LIMIT)
            .await
        {
            Ok(dashboard) => self.send(chat_id, &render::dashboard(&dashboard)).await,
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    async fn fallback(&self, chat_id: i64, user_id: UserId) -> Result<()> {
        match self.engine.ledger.is_verified(user_id).await {
            Ok(true) => self.send(chat_id, &render::menu("Use the menu below.")).await,
            Ok(false) => self.refuse(chat_id, LedgerError::NotVerified).await,
            Err(e) => self.refuse(chat_id, e).await,
        }
    }

    fn home(&self) -> Reply {
        render::home(self.engine.ledger.bonus())
    }

    fn content_url(&self) -> Option<&str> {
        self.telegram.content_url.as_deref()
    }

    /// Text for a refused action; storage trouble is also logged
    fn explain(&self, err: &LedgerError) -> String {
        if matches!(
            err,
            LedgerError::StorageUnavailable(_) | LedgerError::Storage(_) | LedgerError::Invariant(_)
        ) {
            warn!(error = %err, "Action failed on storage");
        }
        render::refusal(err, self.engine.ledger.bonus())
    }

    async fn refuse(&self, chat_id: i64, err: LedgerError) -> Result<()> {
        let reply = match err {
            LedgerError::NotVerified => {
                render::verify_first(&self.telegram.channel_username, self.content_url())
            }
            other => render::menu(self.explain(&other)),
        };
        self.send(chat_id, &reply).await
    }

    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        self.messenger.send(chat_id, reply).await.map(|_| ())
    }

    async fn edit_or_send(
        &self,
        chat_id: i64,
        message_id: Option<i64>,
        reply: &Reply,
    ) -> Result<()> {
        if let Some(message_id) = message_id {
            match self.api.edit_message_text(chat_id, message_id, reply).await {
                Ok(()) => return Ok(()),
                Err(e) => debug!(chat_id, message_id, error = %e, "Edit failed, sending instead"),
            }
        }
        self.send(chat_id, reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeChat;
    use crate::keyboards;
    use crate::notifier::{ChannelMembership, TelegramNotifier};
    use chrono::Utc;
    use ledger_core::{AppConfig, LedgerStore, User, WithdrawalStatus};
    use ledger_engine::ManualClock;
    use ledger_store::MemoryStore;
    use rust_decimal::Decimal;
    use serde_json::json;

    const OPERATOR: i64 = 1;
    const ALICE: i64 = 500;
    const BOB: i64 = 501;
    const ADDRESS: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    struct Harness {
        dispatcher: Dispatcher,
        chat: Arc<FakeChat>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn config(ttl: &str) -> AppConfig {
        let ttl = ttl.to_string();
        AppConfig::load_from(move |key| match key {
            "BOT_TOKEN" => Some("123:abc".to_string()),
            "ADMIN_ID" => Some(OPERATOR.to_string()),
            "CHANNEL_USERNAME" => Some("@earners".to_string()),
            "CONTENT_URL" => Some("https://example.com/channel".to_string()),
            "BOT_MESSAGE_TTL" => Some(ttl.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn harness_with_ttl(ttl: &str) -> Harness {
        let config = config(ttl);
        let chat = Arc::new(FakeChat::default());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = Engine::new(
            &config,
            store.clone(),
            Arc::new(TelegramNotifier::new(chat.clone())),
            clock.clone(),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(engine),
            chat.clone(),
            Arc::new(ChannelMembership::new(
                chat.clone(),
                &config.telegram.channel_username,
            )),
            config.telegram.clone(),
        );
        Harness {
            dispatcher,
            chat,
            store,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with_ttl("0")
    }

    fn text(from: i64, text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": from, "is_bot": false, "first_name": "T", "username": format!("user{from}")},
                "chat": {"id": from, "type": "private"},
                "date": 0,
                "text": text
            }
        }))
        .unwrap()
    }

    fn click(from: i64, data: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb",
                "from": {"id": from, "is_bot": false, "first_name": "T"},
                "message": {"message_id": 77, "chat": {"id": from, "type": "private"}, "date": 0},
                "data": data
            }
        }))
        .unwrap()
    }

    fn last_text(h: &Harness, chat: i64) -> String {
        h.chat.last_sent(chat).unwrap().text
    }

    async fn verified_user(h: &Harness, id: i64) {
        h.dispatcher.handle(text(id, "/start")).await.unwrap();
        h.dispatcher.handle(click(id, "check_both")).await.unwrap();
    }

    async fn fund(h: &Harness, id: i64, amount: Decimal) {
        h.store
            .modify_user(id, &move |u: &mut User| u.credit(amount))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_with_referral_credits_referrer() {
        let h = harness();
        h.dispatcher.handle(text(ALICE, "/start")).await.unwrap();
        h.dispatcher
            .handle(text(BOB, &format!("/start ref{ALICE}")))
            .await
            .unwrap();

        assert!(h
            .chat
            .texts_to(ALICE)
            .contains(&"🎉 You earned 0.01 BNB from a referral!".to_string()));
        let bob_welcome = h.chat.last_sent(BOB).unwrap();
        assert!(bob_welcome.text.starts_with("👋 Welcome"));
        assert_eq!(
            bob_welcome.keyboard,
            Some(keyboards::verify(
                "earners",
                Some("https://example.com/channel")
            ))
        );
        assert!(h
            .chat
            .texts_to(OPERATOR)
            .contains(&"👤 New user started: @user501 (ID: 501)".to_string()));

        let alice = h.store.get_user(ALICE).await.unwrap().unwrap();
        assert_eq!(alice.referral_count, 1);
        let bob = h.store.get_user(BOB).await.unwrap().unwrap();
        assert_eq!(bob.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_verification_then_daily_bonus() {
        let h = harness();
        verified_user(&h, ALICE).await;

        assert!(h
            .chat
            .edits()
            .contains(&"✅ Verification complete, main menu sent.".to_string()));
        assert_eq!(
            h.chat.member_lookups(),
            vec![("@earners".to_string(), ALICE)]
        );

        h.dispatcher.handle(click(ALICE, "claim_daily")).await.unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            "✅ You received 0.001 BNB as the daily bonus!"
        );

        h.dispatcher.handle(text(ALICE, "/claim")).await.unwrap();
        assert_eq!(last_text(&h, ALICE), "⏳ Already claimed. Try again in 24h 0m.");

        h.clock.advance(chrono::Duration::hours(24));
        h.dispatcher.handle(text(ALICE, "/claim")).await.unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            "✅ You received 0.001 BNB as the daily bonus!"
        );
    }

    #[tokio::test]
    async fn test_non_member_stays_unverified() {
        let h = harness();
        h.chat.set_member_status("left");
        verified_user(&h, ALICE).await;
        assert!(h
            .chat
            .edits()
            .iter()
            .any(|t| t.starts_with("❌ You are not a member yet")));

        h.chat.set_member_status(None::<&'static str>);
        h.dispatcher.handle(click(ALICE, "check_both")).await.unwrap();
        assert!(h
            .chat
            .edits()
            .iter()
            .any(|t| t.starts_with("⚠️ Could not verify channel membership")));

        h.dispatcher.handle(click(ALICE, "claim_daily")).await.unwrap();
        assert!(last_text(&h, ALICE).starts_with("You must verify"));
    }

    #[tokio::test]
    async fn test_wallet_prompt_consumes_next_message() {
        let h = harness();
        verified_user(&h, ALICE).await;

        h.dispatcher.handle(click(ALICE, "set_wallet")).await.unwrap();
        h.dispatcher.handle(text(ALICE, "0x1234")).await.unwrap();
        assert!(last_text(&h, ALICE).starts_with("❌ Invalid BSC address"));

        // The prompt is one-shot
        h.dispatcher
            .handle(text(ALICE, &ADDRESS.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(last_text(&h, ALICE), "Use the menu below.");

        h.dispatcher.handle(text(ALICE, "/setwallet")).await.unwrap();
        h.dispatcher
            .handle(text(ALICE, &ADDRESS.to_lowercase()))
            .await
            .unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            format!("✅ Wallet saved: <code>{ADDRESS}</code>")
        );
    }

    #[tokio::test]
    async fn test_withdraw_and_two_phase_reject() {
        let h = harness();
        verified_user(&h, ALICE).await;
        h.dispatcher.handle(text(ALICE, "/setwallet")).await.unwrap();
        h.dispatcher.handle(text(ALICE, ADDRESS)).await.unwrap();

        h.dispatcher.handle(text(ALICE, "/withdraw")).await.unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            "⚠️ Minimum withdrawal is 0.5 BNB. Your balance: 0 BNB"
        );

        fund(&h, ALICE, Decimal::new(5, 1)).await;
        h.dispatcher.handle(click(ALICE, "withdraw")).await.unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            "✅ Withdrawal request submitted. Admin will review it shortly."
        );

        let request = h.store.list_pending_withdrawals(10).await.unwrap()[0].clone();
        let operator_notice = h.chat.last_sent(OPERATOR).unwrap();
        assert!(operator_notice.text.contains("💸 <b>Withdraw Request</b>"));
        assert_eq!(operator_notice.keyboard, Some(keyboards::decision(request.id)));

        // Someone else pressing the buttons is refused
        h.dispatcher
            .handle(click(BOB, &format!("approve:{}", request.id)))
            .await
            .unwrap();
        assert!(h
            .chat
            .edits()
            .contains(&"❌ You are not authorized to perform this action.".to_string()));

        h.dispatcher
            .handle(click(OPERATOR, &format!("reject:{}", request.id)))
            .await
            .unwrap();
        assert!(h
            .chat
            .edits()
            .iter()
            .any(|t| t.starts_with("✏️ Please type the rejection reason now")));

        h.dispatcher
            .handle(text(OPERATOR, "Wallet belongs to another account"))
            .await
            .unwrap();
        assert_eq!(
            last_text(&h, OPERATOR),
            format!("✅ Rejection processed for WID {}. User notified.", request.id)
        );
        assert!(h.chat.texts_to(ALICE).contains(&format!(
            "❌ Your withdrawal (ID {}) was <b>REJECTED</b> by admin.\nReason: Wallet belongs to another account",
            request.id
        )));

        let stored = h.store.get_withdrawal(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Rejected);

        // The next operator message is ordinary text again
        h.dispatcher.handle(text(OPERATOR, "thanks")).await.unwrap();
        assert!(last_text(&h, OPERATOR).starts_with("You must verify"));
    }

    #[tokio::test]
    async fn test_operator_approves_once() {
        let h = harness();
        verified_user(&h, ALICE).await;
        h.dispatcher.handle(text(ALICE, "/setwallet")).await.unwrap();
        h.dispatcher.handle(text(ALICE, ADDRESS)).await.unwrap();
        fund(&h, ALICE, Decimal::new(5, 1)).await;
        h.dispatcher.handle(text(ALICE, "/withdraw")).await.unwrap();
        let id = h.store.list_pending_withdrawals(10).await.unwrap()[0].id;

        h.dispatcher
            .handle(click(OPERATOR, &format!("approve:{id}")))
            .await
            .unwrap();
        h.dispatcher
            .handle(click(OPERATOR, &format!("approve:{id}")))
            .await
            .unwrap();

        let edits = h.chat.edits();
        assert!(edits.contains(&format!(
            "✅ Approved withdrawal ID {id} for user {ALICE}, amount: 0.5 BNB"
        )));
        assert!(edits.contains(&"⚠️ Withdrawal already approved.".to_string()));
        assert!(h.chat.texts_to(ALICE).iter().any(|t| t.contains("APPROVED")));
        assert_eq!(
            h.store.get_user(ALICE).await.unwrap().unwrap().balance,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn test_admin_stats_is_operator_only() {
        let h = harness();
        verified_user(&h, ALICE).await;

        h.dispatcher.handle(text(ALICE, "/admin_stats")).await.unwrap();
        assert_eq!(
            last_text(&h, ALICE),
            "❌ You are not authorized to perform this action."
        );

        h.dispatcher.handle(text(OPERATOR, "/admin_stats")).await.unwrap();
        let stats = last_text(&h, OPERATOR);
        assert!(stats.contains("Total users: 1"));
        assert!(stats.contains("Pending withdrawals: 0"));
    }

    #[tokio::test]
    async fn test_referral_link_uses_bot_username() {
        let h = harness();
        verified_user(&h, ALICE).await;
        h.dispatcher.handle(click(ALICE, "referral")).await.unwrap();
        assert!(last_text(&h, ALICE).contains("https://t.me/EarnerBot?start=ref500"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_message_replaced_and_expired() {
        let h = harness_with_ttl("20");
        h.dispatcher.handle(text(ALICE, "/start")).await.unwrap();
        let first = h.dispatcher.messenger.last_message(ALICE).unwrap();

        h.dispatcher.handle(text(ALICE, "hello")).await.unwrap();
        let second = h.dispatcher.messenger.last_message(ALICE).unwrap();
        assert_ne!(first, second);
        assert_eq!(h.chat.deleted(ALICE), vec![first]);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(h.chat.deleted(ALICE).contains(&second));
        assert_eq!(h.dispatcher.messenger.last_message(ALICE), None);
    }
}
