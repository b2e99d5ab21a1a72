//! Domain model structs held by the in-memory stores.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a rendering host.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_shared::constants::UNKNOWN_USER_NAME;
use parley_shared::protocol::{
    timestamp_to_datetime, ProfileFieldValue, RawMessage, RawPerson, RawReaction, RawStream,
    RawSubscription, RawUserGroup, Recipient,
};
use parley_shared::types::{GroupId, MessageId, Role, StreamId, UserId};
use parley_shared::ProtocolError;

// ---------------------------------------------------------------------------
// Person
// ---------------------------------------------------------------------------

/// A user of the realm, active or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    /// Only visible to administrators and to the user themselves.
    pub delivery_email: Option<String>,
    pub role: Role,
    pub is_bot: bool,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub avatar_version: u64,
    pub timezone: String,
    pub bot_owner_id: Option<UserId>,
    pub is_billing_admin: bool,
    pub profile_data: BTreeMap<String, ProfileFieldValue>,
    /// Set once the server tells us we may no longer see this user.
    pub is_inaccessible: bool,
}

impl Person {
    /// Placeholder kept after a user becomes inaccessible, so old messages
    /// still resolve their sender.
    pub fn tombstone(user_id: UserId) -> Self {
        Self {
            user_id,
            full_name: UNKNOWN_USER_NAME.to_string(),
            email: String::new(),
            delivery_email: None,
            role: Role::Member,
            is_bot: false,
            is_active: false,
            avatar_url: None,
            avatar_version: 0,
            timezone: String::new(),
            bot_owner_id: None,
            is_billing_admin: false,
            profile_data: BTreeMap::new(),
            is_inaccessible: true,
        }
    }
}

impl From<RawPerson> for Person {
    fn from(raw: RawPerson) -> Self {
        Self {
            user_id: raw.user_id,
            full_name: raw.full_name,
            email: raw.email,
            delivery_email: raw.delivery_email,
            role: raw.role,
            is_bot: raw.is_bot,
            is_active: raw.is_active,
            avatar_url: raw.avatar_url,
            avatar_version: raw.avatar_version,
            timezone: raw.timezone,
            bot_owner_id: raw.bot_owner_id,
            is_billing_admin: raw.is_billing_admin,
            profile_data: raw.profile_data,
            is_inaccessible: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A stream, together with this user's subscription settings for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub stream_id: StreamId,
    pub name: String,
    pub description: String,
    pub rendered_description: String,
    pub subscribed: bool,
    pub invite_only: bool,
    pub is_web_public: bool,
    pub history_public_to_subscribers: bool,
    pub stream_post_policy: u8,
    pub message_retention_days: Option<i64>,
    pub color: String,
    pub pin_to_top: bool,
    pub is_muted: bool,
    pub desktop_notifications: Option<bool>,
    pub audible_notifications: Option<bool>,
    pub subscribers: BTreeSet<UserId>,
}

impl Subscription {
    pub fn from_stream(raw: RawStream, subscribed: bool) -> Self {
        Self {
            stream_id: raw.stream_id,
            name: raw.name,
            description: raw.description,
            rendered_description: raw.rendered_description,
            subscribed,
            invite_only: raw.invite_only,
            is_web_public: raw.is_web_public,
            history_public_to_subscribers: raw.history_public_to_subscribers,
            stream_post_policy: raw.stream_post_policy,
            message_retention_days: raw.message_retention_days,
            color: String::new(),
            pin_to_top: false,
            is_muted: false,
            desktop_notifications: None,
            audible_notifications: None,
            subscribers: BTreeSet::new(),
        }
    }

    pub fn from_subscription(raw: RawSubscription, subscribed: bool) -> Self {
        let mut sub = Self::from_stream(raw.stream, subscribed);
        sub.color = raw.color;
        sub.pin_to_top = raw.pin_to_top;
        sub.is_muted = raw.is_muted;
        sub.subscribers = raw.subscribers.into_iter().collect();
        sub
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageFlags {
    pub read: bool,
    pub starred: bool,
    pub mentioned: bool,
    pub collapsed: bool,
}

impl MessageFlags {
    pub fn from_wire(flags: &[String]) -> Self {
        let has = |name: &str| flags.iter().any(|f| f == name);
        Self {
            read: has("read"),
            starred: has("starred"),
            mentioned: has("mentioned") || has("wildcard_mentioned"),
            collapsed: has("collapsed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji_name: String,
    pub emoji_code: String,
    pub reaction_type: String,
}

impl From<RawReaction> for Reaction {
    fn from(raw: RawReaction) -> Self {
        Self {
            user_id: raw.user_id,
            emoji_name: raw.emoji_name,
            emoji_code: raw.emoji_code,
            reaction_type: raw.reaction_type,
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_full_name: String,
    pub sender_email: String,
    pub avatar_url: Option<String>,
    /// Rendered HTML content.
    pub content: String,
    pub recipient: Recipient,
    pub timestamp: DateTime<Utc>,
    pub flags: MessageFlags,
    /// `None` until the renderer has decided whether the message is long
    /// enough to condense; `Some(false)` once the user expanded it.
    pub condensed: Option<bool>,
    pub reactions: Vec<Reaction>,
    /// Inserted optimistically, not yet acknowledged by the server.
    pub locally_echoed: bool,
    pub last_edit_timestamp: Option<DateTime<Utc>>,
    pub match_content: Option<String>,
    pub match_topic: Option<String>,
}

impl Message {
    pub fn from_raw(raw: RawMessage, event_flags: &[String]) -> Result<Self, ProtocolError> {
        let recipient = raw.recipient()?;
        let flags = if event_flags.is_empty() {
            MessageFlags::from_wire(&raw.flags)
        } else {
            MessageFlags::from_wire(event_flags)
        };
        Ok(Self {
            id: raw.id,
            sender_id: raw.sender_id,
            sender_full_name: raw.sender_full_name,
            sender_email: raw.sender_email,
            avatar_url: raw.avatar_url,
            content: raw.content,
            recipient,
            timestamp: timestamp_to_datetime(raw.timestamp),
            flags,
            condensed: None,
            reactions: raw.reactions.into_iter().map(Reaction::from).collect(),
            locally_echoed: false,
            last_edit_timestamp: raw.last_edit_timestamp.map(timestamp_to_datetime),
            match_content: raw.match_content,
            match_topic: raw.match_subject,
        })
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        match &self.recipient {
            Recipient::Stream { stream_id, .. } => Some(*stream_id),
            Recipient::Direct { .. } => None,
        }
    }

    pub fn topic(&self) -> Option<&str> {
        match &self.recipient {
            Recipient::Stream { topic, .. } => Some(topic),
            Recipient::Direct { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// User group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserGroup {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub members: BTreeSet<UserId>,
    pub is_system_group: bool,
}

impl From<RawUserGroup> for UserGroup {
    fn from(raw: RawUserGroup) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            members: raw.members.into_iter().collect(),
            is_system_group: raw.is_system_group,
        }
    }
}

// ---------------------------------------------------------------------------
// User status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStatus {
    pub away: bool,
    pub status_text: String,
    pub emoji_name: String,
    pub emoji_code: String,
    pub reaction_type: String,
}

impl UserStatus {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
