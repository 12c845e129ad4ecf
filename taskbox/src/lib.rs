//! `TaskBox`: task and project stores for a mail-driven inbox.

pub mod config;
pub mod logging;
pub mod mail;
pub mod persist;
pub mod projects;
pub mod registry;
pub mod shell;
pub mod tasks;
