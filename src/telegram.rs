/// Pickem — Telegram
///
/// Long-poll `getUpdates` → `/pick <text>` → `PickService::submit` → jedna
/// odpověď do stejného chatu. Odesílatel = `from.id`.

use anyhow::{Context, Result};
use pick_ledger::PickService;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const USAGE: &str = "🏒 Pick'em bot\n\n\
    Submit today's picks, one per game, separated by commas or new lines:\n\
    /pick Regina, Calgary, Brandon\n\n\
    The number of picks must match today's game count.";

#[derive(Debug, Deserialize)]
struct TgUpdatesResponse {
    ok:     bool,
    result: Vec<TgUpdate>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message:   Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Everything after the command word, newlines kept.
    Pick(String),
    Start,
    Help,
}

/// `/pick A, B`, `/pick@PickemBot A\nB`, `/start`, `/help`. Anything else is ignored,
/// including commands addressed to a bot other than `bot_username`.
pub fn parse_command(text: &str, bot_username: &str) -> Option<Command> {
    let text = text.trim_start();
    if !text.starts_with('/') {
        return None;
    }
    let (head, rest) = match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let name = match head.split_once('@') {
        Some((name, target)) if target.eq_ignore_ascii_case(bot_username) => name,
        Some(_) => return None,
        None => head,
    };
    match name {
        "/pick"  => Some(Command::Pick(rest.trim().to_string())),
        "/start" => Some(Command::Start),
        "/help"  => Some(Command::Help),
        _ => None,
    }
}

pub struct TelegramBot {
    client:   reqwest::Client,
    token:    String,
    service:  Arc<PickService>,
    username: String,
}

impl TelegramBot {
    pub fn new(token: impl Into<String>, service: Arc<PickService>, timeout: Duration) -> Result<Self> {
        // getUpdates long-polls for 25s, so the client timeout has to cover it
        let client = reqwest::Client::builder()
            .timeout(timeout + Duration::from_secs(30))
            .build()
            .context("telegram http client")?;
        Ok(Self { client, token: token.into(), service, username: String::new() })
    }

    pub async fn run_forever(mut self) {
        // `/cmd@name` suffixes are matched against our own username
        loop {
            match self.get_me().await {
                Ok(name) => {
                    self.username = name;
                    break;
                }
                Err(e) => {
                    warn!("getMe error: {e:#}");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
        info!("Telegram bot @{} polling for /pick commands", self.username);
        let mut update_offset: i64 = 0;
        loop {
            match self.get_updates(update_offset).await {
                Ok(updates) => {
                    for u in updates.result {
                        update_offset = u.update_id + 1;
                        if let Some(msg) = u.message {
                            self.handle(msg).await;
                        }
                    }
                }
                Err(e) => {
                    warn!("getUpdates error: {e:#}");
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle(&self, msg: TgMessage) {
        let Some(cmd) = msg.text.as_deref().and_then(|t| parse_command(t, &self.username)) else { return };
        let reply = match cmd {
            Command::Start | Command::Help => USAGE.to_string(),
            Command::Pick(raw) => {
                let Some(user) = &msg.from else {
                    debug!("Ignoring /pick without sender in chat {}", msg.chat.id);
                    return;
                };
                self.service.submit(&user.id.to_string(), &raw).await
            }
        };
        if let Err(e) = self.send_message(msg.chat.id, &reply).await {
            warn!("Reply to chat {} failed: {e:#}", msg.chat.id);
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage failed: {status} {body}");
        }
        Ok(())
    }

    async fn get_me(&self) -> Result<String> {
        let url = format!("https://api.telegram.org/bot{}/getMe", self.token);
        let resp: serde_json::Value = self.client.get(&url).send().await?.json().await?;
        bot_username(&resp)
    }

    async fn get_updates(&self, offset: i64) -> Result<TgUpdatesResponse> {
        let url = format!(
            "https://api.telegram.org/bot{}/getUpdates?offset={}&timeout=25&allowed_updates=[\"message\"]",
            self.token, offset
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("getUpdates HTTP {status}: {body}");
        }
        let parsed: TgUpdatesResponse = serde_json::from_str(&body).with_context(|| {
            format!("Failed to parse getUpdates: {}", body.chars().take(200).collect::<String>())
        })?;
        if !parsed.ok {
            anyhow::bail!("getUpdates returned ok=false");
        }
        Ok(parsed)
    }
}

fn bot_username(get_me: &serde_json::Value) -> Result<String> {
    get_me["result"]["username"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .with_context(|| format!("getMe without username: {get_me}"))
}
