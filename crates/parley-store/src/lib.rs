//! # parley-store
//!
//! In-memory entity stores for a Parley session: people, streams and
//! subscriptions, the message cache, user groups, topic visibility, user
//! status, presence, typing, and realm / personal settings.
//!
//! Every store is a plain owned struct keyed by numeric id. Nothing here is
//! global; a session owns one [`Stores`] and passes it by reference to the
//! code that mutates it. Lookups of unknown ids fail with [`StoreError`]
//! rather than panicking.

pub mod current_user;
pub mod messages;
pub mod models;
pub mod people;
pub mod presence;
pub mod realm;
pub mod settings;
pub mod streams;
pub mod typing;
pub mod user_groups;
pub mod user_status;
pub mod user_topics;

mod error;
mod stores;

pub use current_user::CurrentUser;
pub use error::{Result, StoreError};
pub use models::*;
pub use stores::Stores;
