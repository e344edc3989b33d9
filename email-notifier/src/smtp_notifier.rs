use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::{NotificationMessage, Notifier};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_MAIL_HOST: &str = "smtp.163.com";

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailSecurity {
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
    /// No encryption at all. Only meant for local test servers.
    None,
}

impl std::str::FromStr for MailSecurity {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(anyhow::anyhow!(
                "Unknown mail security mode '{}', expected tls, starttls or none",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: Option<u16>,
    pub security: MailSecurity,
    pub username: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &"***")
            .field("recipients", &self.recipients)
            .finish()
    }
}

impl MailConfig {
    /// Read the mail settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the mail settings from an arbitrary key lookup.
    ///
    /// Recognized keys: `MAIL_HOST`, `MAIL_PORT`, `MAIL_SECURITY`,
    /// `MAIL_ACCOUNT`, `MAIL_PASSWORD` and `MAIL_RECIPIENTS` (comma separated).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = non_empty("MAIL_HOST").unwrap_or_else(|| DEFAULT_MAIL_HOST.to_string());

        let port = match non_empty("MAIL_PORT") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("Invalid MAIL_PORT '{}': {}", raw, e))?,
            ),
            None => None,
        };

        let security = match non_empty("MAIL_SECURITY") {
            Some(raw) => raw.parse()?,
            None => MailSecurity::Tls,
        };

        let username = non_empty("MAIL_ACCOUNT")
            .ok_or_else(|| anyhow::anyhow!("MAIL_ACCOUNT is not set"))?;
        let password = non_empty("MAIL_PASSWORD")
            .ok_or_else(|| anyhow::anyhow!("MAIL_PASSWORD is not set"))?;

        let recipients: Vec<String> = non_empty("MAIL_RECIPIENTS")
            .map(|raw| {
                raw.split(',')
                    .map(|address| address.trim().to_string())
                    .filter(|address| !address.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if recipients.is_empty() {
            return Err(anyhow::anyhow!("MAIL_RECIPIENTS must list at least one address"));
        }

        Ok(Self {
            host,
            port,
            security,
            username,
            password,
            recipients,
        })
    }
}

/// Sends notification messages to a fixed recipient list over SMTP.
pub struct SmtpNotifier {
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Result<Self> {
        let sender: Mailbox = config
            .username
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid sender address '{}': {}", config.username, e))?;

        let recipients = config
            .recipients
            .iter()
            .map(|address| {
                address
                    .parse::<Mailbox>()
                    .map_err(|e| anyhow::anyhow!("Invalid recipient address '{}': {}", address, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let transport = build_transport(&config)?;

        info!(
            "Mail notifier ready: {} ({:?}), {} recipient(s)",
            config.host,
            config.security,
            recipients.len()
        );

        Ok(Self {
            sender,
            recipients,
            transport,
        })
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.recipients
    }

    /// Fresh `Message-ID` value in the sender's domain.
    pub fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.sender.email.domain())
    }

    /// Render a notification into a plain-text email addressed to every recipient.
    pub fn build_message(&self, message: &NotificationMessage, message_id: &str) -> Result<Message> {
        let mut builder = Message::builder()
            .message_id(Some(message_id.to_string()))
            .from(self.sender.clone())
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        Ok(builder.body(message.body.clone())?)
    }
}

fn build_transport(config: &MailConfig) -> Result<SmtpTransport> {
    let builder = match config.security {
        MailSecurity::Tls => SmtpTransport::relay(&config.host)?,
        MailSecurity::StartTls => SmtpTransport::starttls_relay(&config.host)?,
        MailSecurity::None => {
            warn!("Mail transport to {} is unencrypted", config.host);
            SmtpTransport::builder_dangerous(config.host.as_str())
        }
    };

    let builder = builder.credentials(Credentials::new(
        config.username.clone(),
        config.password.clone(),
    ));

    let builder = match config.port {
        Some(port) => builder.port(port),
        None => builder,
    };

    Ok(builder.build())
}

#[async_trait]
impl Notifier for SmtpNotifier {
    /// Returns the `Message-ID` of the accepted email.
    async fn notify(&self, message: &NotificationMessage) -> Result<String> {
        let message_id = self.new_message_id();
        let email = self.build_message(message, &message_id)?;
        let transport = self.transport.clone();

        debug!("Sending mail '{}' to {} recipient(s)", message.subject, self.recipients.len());

        // lettre's SmtpTransport is blocking
        let response = tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| anyhow::anyhow!("Mail dispatch task failed: {}", e))?
            .map_err(|e| anyhow::anyhow!("Failed to send email via SMTP: {}", e))?;

        let reply = response
            .message()
            .map(|line| line.to_string())
            .collect::<Vec<String>>()
            .join(" ");

        info!("Mail sent: {} ({} {})", message_id, response.code(), reply.trim());
        Ok(message_id)
    }
}
