use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BotServerConfig {
    /// Webhook server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Webhook server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL; the webhook is registered when set
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl BotServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup("BOT_HOST").unwrap_or_else(default_host),
            port: lookup("PORT")
                .or_else(|| lookup("BOT_PORT"))
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_else(default_port),
            public_url: lookup("PUBLIC_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full webhook URL for `bot_token`, if a public URL is configured
    pub fn webhook_url(&self, bot_token: &str) -> Option<String> {
        self.public_url
            .as_ref()
            .map(|base| format!("{}/webhook/{}", base, bot_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_port_and_webhook_url() {
        let env: HashMap<&str, &str> =
            HashMap::from([("PORT", "8080"), ("PUBLIC_URL", "https://bot.example.com/")]);
        let config = BotServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(
            config.webhook_url("123:abc").as_deref(),
            Some("https://bot.example.com/webhook/123:abc")
        );
    }

    #[test]
    fn test_defaults() {
        let config = BotServerConfig::from_lookup(|_| None);
        assert_eq!(config.port, 5000);
        assert_eq!(config.webhook_url("t"), None);
    }
}
