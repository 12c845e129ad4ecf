//! Mail-side helpers: HTML body conversion and message snoozing.
//!
//! The real mailbox is an external service; it is reached only through the
//! [`snooze::Mailbox`] trait.

pub mod html;
pub mod snooze;

pub use html::html_to_text;
pub use snooze::{MailError, Mailbox, MemoryMailbox, SnoozeEntry, SnoozeScheduler};
