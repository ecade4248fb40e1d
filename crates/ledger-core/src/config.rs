use crate::amount::parse_config_amount;
use crate::error::{LedgerError, Result};
use crate::types::UserId;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Amounts paid out and required by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusConfig {
    /// Credited to a referrer per newly onboarded user
    pub referral_bonus: Decimal,
    /// Credited once per cooldown window
    pub daily_bonus: Decimal,
    /// Smallest balance that may be withdrawn
    pub min_withdrawal: Decimal,
    /// Minimum time between two daily bonus grants
    pub cooldown: chrono::Duration,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            referral_bonus: Decimal::new(1, 2),
            daily_bonus: Decimal::new(1, 3),
            min_withdrawal: Decimal::new(5, 1),
            cooldown: chrono::Duration::hours(24),
        }
    }
}

/// Telegram collaborator settings
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Public channel users must join, without the leading `@`
    pub channel_username: String,
    /// External content users are asked to subscribe to
    pub content_url: Option<String>,
    /// Seconds before a bot message is deleted (0 disables auto-delete)
    pub message_ttl_secs: u64,
}

/// Bounds on storage calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            retry_attempts: 3,
            retry_delay_ms: 200,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// The single operator allowed to approve and reject withdrawals
    pub operator_id: UserId,
    pub bonus: BonusConfig,
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    /// How long a reject intent waits for its reason
    pub reject_session_ttl_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(sanitize)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| LedgerError::MissingEnvVar(key.to_string()))
        };

        let bot_token = required("BOT_TOKEN")?;
        let operator_id: UserId = required("ADMIN_ID")?
            .parse()
            .map_err(|_| LedgerError::InvalidConfig("ADMIN_ID (invalid format)".to_string()))?;
        if operator_id == 0 {
            return Err(LedgerError::InvalidConfig("ADMIN_ID must be non-zero".to_string()));
        }
        let channel_username = required("CHANNEL_USERNAME")?
            .trim_start_matches('@')
            .to_string();
        let content_url = lookup("CONTENT_URL")
            .or_else(|| lookup("YOUTUBE_URL"))
            .map(sanitize)
            .filter(|v| !v.is_empty());

        let defaults = BonusConfig::default();
        let amount = |key: &str, default: Decimal| -> Result<Decimal> {
            match lookup(key) {
                Some(raw) => parse_config_amount(key, &sanitize(raw)),
                None => Ok(default),
            }
        };
        let bonus = BonusConfig {
            referral_bonus: amount("REF_BONUS", defaults.referral_bonus)?,
            daily_bonus: amount("DAILY_BONUS", defaults.daily_bonus)?,
            min_withdrawal: amount("MIN_WITHDRAW", defaults.min_withdrawal)?,
            cooldown: defaults.cooldown,
        };
        if bonus.min_withdrawal.is_zero() {
            return Err(LedgerError::InvalidConfig(
                "MIN_WITHDRAW must be greater than zero".to_string(),
            ));
        }

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            timeout_ms: parsed(&lookup, "STORAGE_TIMEOUT_MS", storage_defaults.timeout_ms),
            retry_attempts: parsed(
                &lookup,
                "STORAGE_RETRY_ATTEMPTS",
                storage_defaults.retry_attempts,
            ),
            retry_delay_ms: parsed(
                &lookup,
                "STORAGE_RETRY_DELAY_MS",
                storage_defaults.retry_delay_ms,
            ),
        };

        Ok(Self {
            operator_id,
            bonus,
            telegram: TelegramConfig {
                bot_token,
                channel_username,
                content_url,
                message_ttl_secs: parsed(&lookup, "BOT_MESSAGE_TTL", 20),
            },
            storage,
            reject_session_ttl_secs: parsed(&lookup, "REJECT_SESSION_TTL_SECS", 600),
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| sanitize(s).parse().ok())
        .unwrap_or(default)
}

/// Strip whitespace and surrounding quotes left over from `.env` files
fn sanitize(value: String) -> String {
    let trimmed = value.trim();
    let without_quotes = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    without_quotes.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("BOT_TOKEN", "123:abc"),
        ("ADMIN_ID", "99"),
        ("CHANNEL_USERNAME", "@earners"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::load_from(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.operator_id, 99);
        assert_eq!(config.telegram.channel_username, "earners");
        assert_eq!(config.bonus, BonusConfig::default());
        assert_eq!(config.bonus.daily_bonus.to_string(), "0.001");
        assert_eq!(config.bonus.referral_bonus.to_string(), "0.01");
        assert_eq!(config.bonus.min_withdrawal.to_string(), "0.5");
        assert_eq!(config.telegram.message_ttl_secs, 20);
        assert_eq!(config.storage, StorageConfig::default());
        assert_eq!(config.reject_session_ttl_secs, 600);
        assert!(config.telegram.content_url.is_none());
    }

    #[test]
    fn test_overrides_and_quoted_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("DAILY_BONUS", "\"0.002\""),
            ("MIN_WITHDRAW", "1"),
            ("YOUTUBE_URL", "'https://youtube.example/c/x'"),
            ("STORAGE_RETRY_ATTEMPTS", "5"),
        ]);
        let config = AppConfig::load_from(lookup(&pairs)).unwrap();
        assert_eq!(config.bonus.daily_bonus, Decimal::new(2, 3));
        assert_eq!(config.bonus.min_withdrawal, Decimal::ONE);
        assert_eq!(
            config.telegram.content_url.as_deref(),
            Some("https://youtube.example/c/x")
        );
        assert_eq!(config.storage.retry_attempts, 5);
    }

    #[test]
    fn test_missing_or_invalid_operator() {
        let err = AppConfig::load_from(lookup(&[("BOT_TOKEN", "t")])).unwrap_err();
        assert_eq!(err, LedgerError::MissingEnvVar("ADMIN_ID".to_string()));

        let err = AppConfig::load_from(lookup(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_ID", "0"),
            ("CHANNEL_USERNAME", "c"),
        ]))
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REF_BONUS", "-0.01"));
        assert!(matches!(
            AppConfig::load_from(lookup(&pairs)),
            Err(LedgerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_minimum_withdrawal_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MIN_WITHDRAW", "0.000"));
        assert_eq!(
            AppConfig::load_from(lookup(&pairs)).unwrap_err(),
            LedgerError::InvalidConfig("MIN_WITHDRAW must be greater than zero".to_string())
        );
    }
}
