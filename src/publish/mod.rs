//! Publish phase: read the stored daily log, render it and mail it.

pub mod mailer;
pub mod parser;
pub mod render;

pub use mailer::{DeliveryOutcome, MailTransport, Mailer, SmtpMailTransport};
pub use render::{RenderedSummary, render};
