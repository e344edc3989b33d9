pub mod smtp_notifier;

pub use smtp_notifier::{MailConfig, MailSecurity, SmtpNotifier};
