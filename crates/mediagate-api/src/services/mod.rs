//! Collaborator adapters used by handlers

pub mod notify;

pub use notify::{Delivery, MailMessage, Notifier, Tip, TracingNotifier};
