use std::{env, path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use modern_blog_shared::models::ContactMessageRecord;
use serde::Deserialize;

const DEFAULT_EMAIL_ACCOUNTS_FILE: &str = "backend/.local/email_accounts.json";
const FALLBACK_EMAIL_ACCOUNTS_FILE: &str = ".local/email_accounts.json";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Deserialize)]
struct EmailAccountsConfig {
    #[serde(default)]
    smtp_host: Option<String>,
    #[serde(default)]
    smtp_port: Option<u16>,
    username: String,
    app_password: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    admin_recipient: Option<String>,
}

/// Optional SMTP notifier for welcome mails and contact-form alerts. The
/// server runs fine without credentials; sends are fire-and-forget from the
/// handlers and only logged on failure.
#[derive(Clone)]
pub struct EmailNotifier {
    from_mailbox: Mailbox,
    admin_recipient: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn from_env() -> Result<Option<Self>> {
        let path = resolve_email_accounts_file_path();
        if !path.exists() {
            tracing::info!(
                "email notifier disabled: credentials file not found at {}",
                path.display()
            );
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read email accounts file {}", path.display()))?;
        let config: EmailAccountsConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid email accounts JSON: {}", path.display()))?;
        let notifier = Self::build(config)?;
        tracing::info!("email notifier enabled using credentials file {}", path.display());
        Ok(Some(notifier))
    }

    fn build(config: EmailAccountsConfig) -> Result<Self> {
        let username = normalize_required_string(config.username, "username")?;
        let password = normalize_app_password(config.app_password, "app_password")?;
        let smtp_host = config
            .smtp_host
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let smtp_port = config.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);

        let sender_email = normalize_email(username)?;
        let admin_recipient = match normalize_optional_string(config.admin_recipient) {
            Some(value) => normalize_email(value)?,
            None => sender_email.clone(),
        };
        let display_name = normalize_optional_string(config.display_name)
            .unwrap_or_else(|| "ModernBlog".to_string());
        let from_mailbox = Mailbox::from_str(&format!("{display_name} <{sender_email}>"))
            .context("invalid sender mailbox")?;

        let credentials = Credentials::new(sender_email, password);
        let builder = if smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
                .with_context(|| format!("invalid smtp relay host: {smtp_host}"))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
                .with_context(|| format!("invalid smtp starttls host: {smtp_host}"))?
        };
        let mailer = builder.port(smtp_port).credentials(credentials).build();

        Ok(Self {
            from_mailbox,
            admin_recipient,
            mailer,
        })
    }

    pub async fn send_welcome(&self, to: &str, display_name: &str) -> Result<()> {
        let subject = "[ModernBlog] Welcome aboard";
        let body = format!(
            "Hi {display_name},\n\nYour account has been created. Write your first post \
             whenever you are ready.\n\n— The ModernBlog team\n"
        );
        self.send_plain_text_email(to, subject, &body).await
    }

    pub async fn send_admin_contact_notification(
        &self,
        message: &ContactMessageRecord,
    ) -> Result<()> {
        let subject = format!("[ModernBlog] Contact: {}", message.subject);
        let body = format!(
            "New contact message.\n\nFrom: {} <{}>\nSubject: {}\n\n{}\n\nReceived at (ms): {}\n",
            message.name, message.email, message.subject, message.message, message.created_at
        );
        self.send_plain_text_email(&self.admin_recipient, &subject, &body)
            .await
    }

    async fn send_plain_text_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to_mailbox =
            Mailbox::from_str(to).with_context(|| format!("invalid recipient: {to}"))?;
        let email = Message::builder()
            .from(self.from_mailbox.clone())
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
            .context("failed to build email message")?;
        self.mailer
            .send(email)
            .await
            .context("failed to send email via SMTP")?;
        Ok(())
    }
}

fn resolve_email_accounts_file_path() -> PathBuf {
    if let Ok(raw) = env::var("EMAIL_ACCOUNTS_FILE") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    let default_path = PathBuf::from(DEFAULT_EMAIL_ACCOUNTS_FILE);
    if default_path.exists() {
        return default_path;
    }

    let fallback_path = PathBuf::from(FALLBACK_EMAIL_ACCOUNTS_FILE);
    if fallback_path.exists() {
        return fallback_path;
    }

    default_path
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn normalize_required_string(value: String, field_name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{field_name} is required");
    }
    Ok(trimmed.to_string())
}

fn normalize_email(value: String) -> Result<String> {
    let trimmed = value.trim();
    Mailbox::from_str(trimmed).with_context(|| format!("invalid email address: {trimmed}"))?;
    Ok(trimmed.to_string())
}

fn normalize_app_password(value: String, field_name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("{field_name} is required");
    }
    let compact: String = trimmed.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        anyhow::bail!("{field_name} is required");
    }
    Ok(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_blank_credentials() {
        let config = EmailAccountsConfig {
            smtp_host: None,
            smtp_port: None,
            username: "  ".to_string(),
            app_password: "secret".to_string(),
            display_name: None,
            admin_recipient: None,
        };
        assert!(EmailNotifier::build(config).is_err());
    }

    #[test]
    fn build_accepts_minimal_config_and_defaults_admin_recipient() {
        let config = EmailAccountsConfig {
            smtp_host: None,
            smtp_port: None,
            username: "noreply@example.com".to_string(),
            app_password: "abcd efgh ijkl mnop".to_string(),
            display_name: None,
            admin_recipient: None,
        };
        let notifier = EmailNotifier::build(config).expect("build");
        assert_eq!(notifier.admin_recipient, "noreply@example.com");
    }

    #[test]
    fn app_password_whitespace_is_compacted() {
        let compact = normalize_app_password("abcd efgh".to_string(), "app_password")
            .expect("normalize");
        assert_eq!(compact, "abcdefgh");
    }
}
