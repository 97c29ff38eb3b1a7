//! hearth - household task coordination core
//!
//! A shared task board for the members of a household. Tasks move through
//! a small lifecycle (open, claimed, in progress, completed, cancelled);
//! an exclusive claim keeps two people from paying the same bill twice.
//! Every accepted write lands in an append-only activity log, fans out to
//! change-feed subscribers, and synthesizes notifications for the members
//! who didn't perform it.
//!
//! All state is plain files under a data root, guarded by advisory locks
//! and atomic renames, so any number of member processes can operate on
//! the same household concurrently.

pub mod activity;
pub mod claim;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod household;
pub mod lifecycle;
pub mod lock;
pub mod notify;
pub mod output;
pub mod query;
pub mod service;
pub mod storage;
pub mod store;
pub mod task;

pub use error::{Error, Result};
