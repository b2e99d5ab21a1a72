//! Server event wire format.
//!
//! Events arrive as JSON objects tagged by `type`, most of them further
//! discriminated by `op`. A few families (`realm`, `user_settings`,
//! `realm_user_settings_defaults`, `stream/update`, `subscription/update`)
//! carry a `(property, value)` pair; those are converted into typed property
//! enums by the `parse` constructors below so that handlers never match on
//! strings.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::types::{GroupId, MessageId, Role, StreamId, UserId};

/// One event from the server event queue, without its queue `id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    RealmUser(RealmUserEvent),
    Stream(StreamEvent),
    Subscription(SubscriptionEvent),
    Message(NewMessageEvent),
    UpdateMessage(UpdateMessageEvent),
    DeleteMessage(DeleteMessageEvent),
    UpdateMessageFlags(UpdateMessageFlagsEvent),
    Reaction(ReactionEvent),
    UserGroup(UserGroupEvent),
    UserTopic(UserTopicEvent),
    UserStatus(UserStatusEvent),
    Presence(PresenceEvent),
    Typing(TypingEvent),
    Realm(RealmEvent),
    UserSettings(SettingsEvent),
    RealmUserSettingsDefaults(SettingsEvent),
    Heartbeat {},
    Restart(RestartEvent),
}

impl ServerEvent {
    /// Short `type/op` label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::RealmUser(RealmUserEvent::Add { .. }) => "realm_user/add",
            Self::RealmUser(RealmUserEvent::Update { .. }) => "realm_user/update",
            Self::RealmUser(RealmUserEvent::Remove { .. }) => "realm_user/remove",
            Self::Stream(StreamEvent::Create { .. }) => "stream/create",
            Self::Stream(StreamEvent::Update(_)) => "stream/update",
            Self::Stream(StreamEvent::Delete { .. }) => "stream/delete",
            Self::Subscription(SubscriptionEvent::Add { .. }) => "subscription/add",
            Self::Subscription(SubscriptionEvent::Remove { .. }) => "subscription/remove",
            Self::Subscription(SubscriptionEvent::Update { .. }) => "subscription/update",
            Self::Subscription(SubscriptionEvent::PeerAdd { .. }) => "subscription/peer_add",
            Self::Subscription(SubscriptionEvent::PeerRemove { .. }) => "subscription/peer_remove",
            Self::Message(_) => "message",
            Self::UpdateMessage(_) => "update_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::UpdateMessageFlags(UpdateMessageFlagsEvent::Add(_)) => "update_message_flags/add",
            Self::UpdateMessageFlags(UpdateMessageFlagsEvent::Remove(_)) => {
                "update_message_flags/remove"
            }
            Self::Reaction(ReactionEvent::Add(_)) => "reaction/add",
            Self::Reaction(ReactionEvent::Remove(_)) => "reaction/remove",
            Self::UserGroup(UserGroupEvent::Add { .. }) => "user_group/add",
            Self::UserGroup(UserGroupEvent::Remove { .. }) => "user_group/remove",
            Self::UserGroup(UserGroupEvent::AddMembers { .. }) => "user_group/add_members",
            Self::UserGroup(UserGroupEvent::RemoveMembers { .. }) => "user_group/remove_members",
            Self::UserGroup(UserGroupEvent::Update { .. }) => "user_group/update",
            Self::UserTopic(_) => "user_topic",
            Self::UserStatus(_) => "user_status",
            Self::Presence(_) => "presence",
            Self::Typing(TypingEvent::Start(_)) => "typing/start",
            Self::Typing(TypingEvent::Stop(_)) => "typing/stop",
            Self::Realm(RealmEvent::Update { .. }) => "realm/update",
            Self::Realm(RealmEvent::UpdateDict { .. }) => "realm/update_dict",
            Self::Realm(RealmEvent::Deactivated { .. }) => "realm/deactivated",
            Self::UserSettings(_) => "user_settings/update",
            Self::RealmUserSettingsDefaults(_) => "realm_user_settings_defaults/update",
            Self::Heartbeat {} => "heartbeat",
            Self::Restart(_) => "restart",
        }
    }
}

/// Wraps a deserialization failure for one `(property, value)` pair.
fn typed<T: DeserializeOwned>(property: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::InvalidValue {
        property: property.to_string(),
        source,
    })
}

pub fn timestamp_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// realm_user
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPerson {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub delivery_email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub avatar_version: u64,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub bot_owner_id: Option<UserId>,
    #[serde(default)]
    pub is_billing_admin: bool,
    #[serde(default)]
    pub profile_data: BTreeMap<String, ProfileFieldValue>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileFieldValue {
    pub value: String,
    #[serde(default)]
    pub rendered_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RealmUserEvent {
    Add { person: RawPerson },
    Update { person: PersonPatch },
    Remove { person: RemovedPerson },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemovedPerson {
    pub user_id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileFieldUpdate {
    pub id: u64,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub rendered_value: Option<String>,
}

/// One field group of a `realm_user/update` patch.
///
/// The server only sends the fields that changed; which variant applies is
/// decided by which key is present, so `null`, `false` and `0` values still
/// select their variant.
#[derive(Debug, Clone, PartialEq)]
pub enum PersonUpdate {
    FullName { user_id: UserId, full_name: String },
    Email { user_id: UserId, new_email: String },
    DeliveryEmail { user_id: UserId, delivery_email: Option<String> },
    Avatar { user_id: UserId, avatar_url: Option<String>, avatar_version: u64 },
    Role { user_id: UserId, role: Role },
    Timezone { user_id: UserId, timezone: String },
    BotOwner { user_id: UserId, bot_owner_id: Option<UserId> },
    IsActive { user_id: UserId, is_active: bool },
    IsBillingAdmin { user_id: UserId, is_billing_admin: bool },
    CustomProfileField { user_id: UserId, field: ProfileFieldUpdate },
}

impl PersonUpdate {
    pub fn user_id(&self) -> UserId {
        match self {
            Self::FullName { user_id, .. }
            | Self::Email { user_id, .. }
            | Self::DeliveryEmail { user_id, .. }
            | Self::Avatar { user_id, .. }
            | Self::Role { user_id, .. }
            | Self::Timezone { user_id, .. }
            | Self::BotOwner { user_id, .. }
            | Self::IsActive { user_id, .. }
            | Self::IsBillingAdmin { user_id, .. }
            | Self::CustomProfileField { user_id, .. } => *user_id,
        }
    }

    /// Build one variant per field group present in a raw patch.
    ///
    /// A patch that carries none of the known groups is rejected.
    pub fn from_patch(mut patch: Map<String, Value>) -> Result<Vec<Self>, ProtocolError> {
        let user_id: UserId = typed("user_id", patch.remove("user_id").unwrap_or(Value::Null))?;
        let mut take = |key: &str| patch.remove(key);
        let mut updates = Vec::new();

        if let Some(v) = take("full_name") {
            updates.push(Self::FullName { user_id, full_name: typed("full_name", v)? });
        }
        if let Some(v) = take("new_email") {
            updates.push(Self::Email { user_id, new_email: typed("new_email", v)? });
        }
        if let Some(v) = take("delivery_email") {
            updates.push(Self::DeliveryEmail { user_id, delivery_email: typed("delivery_email", v)? });
        }
        if let Some(v) = take("avatar_url") {
            let avatar_version = match take("avatar_version") {
                Some(version) => typed("avatar_version", version)?,
                None => 0,
            };
            updates.push(Self::Avatar { user_id, avatar_url: typed("avatar_url", v)?, avatar_version });
        }
        if let Some(v) = take("role") {
            updates.push(Self::Role { user_id, role: typed("role", v)? });
        }
        if let Some(v) = take("timezone") {
            updates.push(Self::Timezone { user_id, timezone: typed("timezone", v)? });
        }
        if let Some(v) = take("bot_owner_id") {
            updates.push(Self::BotOwner { user_id, bot_owner_id: typed("bot_owner_id", v)? });
        }
        if let Some(v) = take("is_active") {
            updates.push(Self::IsActive { user_id, is_active: typed("is_active", v)? });
        }
        if let Some(v) = take("is_billing_admin") {
            updates.push(Self::IsBillingAdmin { user_id, is_billing_admin: typed("is_billing_admin", v)? });
        }
        if let Some(v) = take("custom_profile_field") {
            updates.push(Self::CustomProfileField { user_id, field: typed("custom_profile_field", v)? });
        }

        if updates.is_empty() {
            return Err(ProtocolError::UnrecognizedPersonUpdate(user_id.0));
        }
        Ok(updates)
    }
}

/// A whole `realm_user/update` patch, split into its field groups in a
/// fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonPatch(pub Vec<PersonUpdate>);

impl PersonPatch {
    pub fn updates(&self) -> &[PersonUpdate] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PersonPatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let patch = Map::deserialize(deserializer)?;
        PersonUpdate::from_patch(patch)
            .map(PersonPatch)
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// stream / subscription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawStream {
    pub stream_id: StreamId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rendered_description: String,
    #[serde(default)]
    pub invite_only: bool,
    #[serde(default)]
    pub is_web_public: bool,
    #[serde(default = "default_post_policy")]
    pub stream_post_policy: u8,
    #[serde(default)]
    pub message_retention_days: Option<i64>,
    #[serde(default = "default_true")]
    pub history_public_to_subscribers: bool,
}

fn default_post_policy() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSubscription {
    #[serde(flatten)]
    pub stream: RawStream,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub pin_to_top: bool,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub subscribers: Vec<UserId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamRef {
    pub stream_id: StreamId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StreamEvent {
    Create {
        streams: Vec<RawStream>,
    },
    Update(StreamUpdate),
    Delete {
        #[serde(default)]
        stream_ids: Vec<StreamId>,
        #[serde(default)]
        streams: Vec<StreamRef>,
    },
}

impl StreamEvent {
    /// Ids of deleted streams, from either the current or the legacy shape.
    pub fn deleted_ids(stream_ids: &[StreamId], streams: &[StreamRef]) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = stream_ids.to_vec();
        ids.extend(streams.iter().map(|s| s.stream_id));
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamUpdate {
    pub stream_id: StreamId,
    pub property: String,
    pub value: Value,
    #[serde(default)]
    pub rendered_description: Option<String>,
    #[serde(default)]
    pub is_web_public: Option<bool>,
    #[serde(default)]
    pub history_public_to_subscribers: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamProperty {
    Name(String),
    Description { description: String, rendered: Option<String> },
    InviteOnly { invite_only: bool, is_web_public: Option<bool>, history_public: Option<bool> },
    StreamPostPolicy(u8),
    MessageRetentionDays(Option<i64>),
}

impl StreamProperty {
    pub fn parse(update: &StreamUpdate) -> Result<Self, ProtocolError> {
        let value = update.value.clone();
        match update.property.as_str() {
            "name" => Ok(Self::Name(typed("name", value)?)),
            "description" => Ok(Self::Description {
                description: typed("description", value)?,
                rendered: update.rendered_description.clone(),
            }),
            "invite_only" => Ok(Self::InviteOnly {
                invite_only: typed("invite_only", value)?,
                is_web_public: update.is_web_public,
                history_public: update.history_public_to_subscribers,
            }),
            "stream_post_policy" => Ok(Self::StreamPostPolicy(typed("stream_post_policy", value)?)),
            "message_retention_days" => {
                Ok(Self::MessageRetentionDays(typed("message_retention_days", value)?))
            }
            other => Err(ProtocolError::UnknownProperty {
                scope: "stream",
                property: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    Add {
        subscriptions: Vec<RawSubscription>,
    },
    Remove {
        subscriptions: Vec<StreamRef>,
    },
    Update {
        stream_id: StreamId,
        property: String,
        value: Value,
    },
    PeerAdd {
        stream_ids: Vec<StreamId>,
        user_ids: Vec<UserId>,
    },
    PeerRemove {
        stream_ids: Vec<StreamId>,
        user_ids: Vec<UserId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionProperty {
    Color(String),
    PinToTop(bool),
    IsMuted(bool),
    DesktopNotifications(Option<bool>),
    AudibleNotifications(Option<bool>),
}

impl SubscriptionProperty {
    pub fn parse(property: &str, value: Value) -> Result<Self, ProtocolError> {
        match property {
            "color" => Ok(Self::Color(typed(property, value)?)),
            "pin_to_top" => Ok(Self::PinToTop(typed(property, value)?)),
            "is_muted" => Ok(Self::IsMuted(typed(property, value)?)),
            // Legacy inverse of is_muted.
            "in_home_view" => Ok(Self::IsMuted(!typed::<bool>(property, value)?)),
            "desktop_notifications" => Ok(Self::DesktopNotifications(typed(property, value)?)),
            "audible_notifications" => Ok(Self::AudibleNotifications(typed(property, value)?)),
            other => Err(ProtocolError::UnknownProperty {
                scope: "subscription",
                property: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// messages
// ---------------------------------------------------------------------------

/// Where a message was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    Stream { stream_id: StreamId, topic: String },
    Direct { user_ids: Vec<UserId> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DisplayRecipient {
    Stream(String),
    Users(Vec<RecipientUser>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawReaction {
    pub user_id: UserId,
    pub emoji_name: String,
    pub emoji_code: String,
    #[serde(default = "default_reaction_type")]
    pub reaction_type: String,
}

fn default_reaction_type() -> String {
    "unicode_emoji".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_full_name: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub stream_id: Option<StreamId>,
    #[serde(default, rename = "subject", alias = "topic")]
    pub topic: Option<String>,
    pub display_recipient: DisplayRecipient,
    pub timestamp: i64,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<RawReaction>,
    #[serde(default)]
    pub last_edit_timestamp: Option<i64>,
    #[serde(default)]
    pub match_content: Option<String>,
    #[serde(default)]
    pub match_subject: Option<String>,
}

impl RawMessage {
    pub fn recipient(&self) -> Result<Recipient, ProtocolError> {
        match (&self.display_recipient, self.stream_id) {
            (DisplayRecipient::Stream(_), Some(stream_id)) => Ok(Recipient::Stream {
                stream_id,
                topic: self.topic.clone().unwrap_or_default(),
            }),
            (DisplayRecipient::Users(users), _) => Ok(Recipient::Direct {
                user_ids: users.iter().map(|u| u.id).collect(),
            }),
            (DisplayRecipient::Stream(name), None) => Err(ProtocolError::UnknownProperty {
                scope: "message recipient",
                property: format!("stream {name} without stream_id"),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessageEvent {
    pub message: RawMessage,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub local_message_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessageEvent {
    pub message_id: MessageId,
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub rendered_content: Option<String>,
    #[serde(default)]
    pub edit_timestamp: Option<i64>,
    #[serde(default)]
    pub stream_id: Option<StreamId>,
    #[serde(default)]
    pub new_stream_id: Option<StreamId>,
    #[serde(default)]
    pub orig_subject: Option<String>,
    #[serde(default, rename = "subject", alias = "topic")]
    pub topic: Option<String>,
    #[serde(default)]
    pub rendering_only: bool,
}

impl UpdateMessageEvent {
    /// All affected ids; older servers only send `message_id`.
    pub fn affected_ids(&self) -> Vec<MessageId> {
        if self.message_ids.is_empty() {
            vec![self.message_id]
        } else {
            self.message_ids.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteMessageEvent {
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

impl DeleteMessageEvent {
    pub fn ids(&self) -> Vec<MessageId> {
        let mut ids = self.message_ids.clone();
        ids.extend(self.message_id);
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFlag {
    Read,
    Starred,
    Collapsed,
    Mentioned,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagChange {
    pub flag: MessageFlag,
    #[serde(default)]
    pub messages: Vec<MessageId>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UpdateMessageFlagsEvent {
    Add(FlagChange),
    Remove(FlagChange),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionData {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji_name: String,
    pub emoji_code: String,
    #[serde(default = "default_reaction_type")]
    pub reaction_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReactionEvent {
    Add(ReactionData),
    Remove(ReactionData),
}

// ---------------------------------------------------------------------------
// user groups, topics, status, presence, typing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawUserGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub is_system_group: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupUpdateData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UserGroupEvent {
    Add { group: RawUserGroup },
    Remove { group_id: GroupId },
    AddMembers { group_id: GroupId, user_ids: Vec<UserId> },
    RemoveMembers { group_id: GroupId, user_ids: Vec<UserId> },
    Update { group_id: GroupId, data: GroupUpdateData },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VisibilityPolicy {
    Inherit,
    Muted,
    Unmuted,
    Followed,
}

impl TryFrom<u8> for VisibilityPolicy {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Inherit),
            1 => Ok(Self::Muted),
            2 => Ok(Self::Unmuted),
            3 => Ok(Self::Followed),
            other => Err(format!("unknown visibility policy {other}")),
        }
    }
}

impl From<VisibilityPolicy> for u8 {
    fn from(policy: VisibilityPolicy) -> Self {
        match policy {
            VisibilityPolicy::Inherit => 0,
            VisibilityPolicy::Muted => 1,
            VisibilityPolicy::Unmuted => 2,
            VisibilityPolicy::Followed => 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserTopicEvent {
    pub stream_id: StreamId,
    pub topic_name: String,
    #[serde(default)]
    pub last_updated: i64,
    pub visibility_policy: VisibilityPolicy,
}

/// Field-level user status patch; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusPatch {
    #[serde(default)]
    pub away: Option<bool>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub emoji_name: Option<String>,
    #[serde(default)]
    pub emoji_code: Option<String>,
    #[serde(default)]
    pub reaction_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserStatusEvent {
    pub user_id: UserId,
    #[serde(flatten)]
    pub patch: StatusPatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Offline,
    Idle,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPresence {
    pub status: PresenceStatus,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceEvent {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub server_timestamp: f64,
    #[serde(default)]
    pub presence: BTreeMap<String, ClientPresence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingUser {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypingData {
    pub sender: TypingUser,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub recipients: Vec<TypingUser>,
    #[serde(default)]
    pub stream_id: Option<StreamId>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TypingEvent {
    Start(TypingData),
    Stop(TypingData),
}

// ---------------------------------------------------------------------------
// realm and settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RealmEvent {
    Update { property: String, value: Value },
    UpdateDict { property: String, data: Map<String, Value> },
    Deactivated { realm_id: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RealmProperty {
    Name(String),
    Description(String),
    InviteRequired(bool),
    EmailsRestrictedToDomains(bool),
    AllowMessageEditing(bool),
    MessageContentEditLimitSeconds(Option<u64>),
    WaitingPeriodThreshold(u64),
    DefaultLanguage(String),
    EnableSpectatorAccess(bool),
    DefaultCodeBlockLanguage(String),
    PlanType(u8),
    OrgType(u16),
    MessageRetentionDays(Option<i64>),
    Icon { url: String, source: String },
    Logo { url: String, source: String, night: bool },
}

impl RealmProperty {
    pub fn parse(property: &str, value: Value) -> Result<Self, ProtocolError> {
        match property {
            "name" => Ok(Self::Name(typed(property, value)?)),
            "description" => Ok(Self::Description(typed(property, value)?)),
            "invite_required" => Ok(Self::InviteRequired(typed(property, value)?)),
            "emails_restricted_to_domains" => {
                Ok(Self::EmailsRestrictedToDomains(typed(property, value)?))
            }
            "allow_message_editing" => Ok(Self::AllowMessageEditing(typed(property, value)?)),
            "message_content_edit_limit_seconds" => {
                Ok(Self::MessageContentEditLimitSeconds(typed(property, value)?))
            }
            "waiting_period_threshold" => Ok(Self::WaitingPeriodThreshold(typed(property, value)?)),
            "default_language" => Ok(Self::DefaultLanguage(typed(property, value)?)),
            "enable_spectator_access" => Ok(Self::EnableSpectatorAccess(typed(property, value)?)),
            "default_code_block_language" => {
                Ok(Self::DefaultCodeBlockLanguage(typed(property, value)?))
            }
            "plan_type" => Ok(Self::PlanType(typed(property, value)?)),
            "org_type" => Ok(Self::OrgType(typed(property, value)?)),
            "message_retention_days" => Ok(Self::MessageRetentionDays(typed(property, value)?)),
            other => Err(ProtocolError::UnknownProperty {
                scope: "realm",
                property: other.to_string(),
            }),
        }
    }

    /// Expand a `realm/update_dict` payload into individual properties.
    pub fn parse_dict(property: &str, mut data: Map<String, Value>) -> Result<Vec<Self>, ProtocolError> {
        fn field(data: &mut Map<String, Value>, key: &str) -> Result<String, ProtocolError> {
            typed(key, data.remove(key).unwrap_or(Value::Null))
        }
        match property {
            "default" => data
                .into_iter()
                .map(|(key, value)| Self::parse(&key, value))
                .collect(),
            "icon" => Ok(vec![Self::Icon {
                url: field(&mut data, "icon_url")?,
                source: field(&mut data, "icon_source")?,
            }]),
            "logo" => Ok(vec![Self::Logo {
                url: field(&mut data, "logo_url")?,
                source: field(&mut data, "logo_source")?,
                night: false,
            }]),
            "night_logo" => Ok(vec![Self::Logo {
                url: field(&mut data, "night_logo_url")?,
                source: field(&mut data, "night_logo_source")?,
                night: true,
            }]),
            other => Err(ProtocolError::UnknownProperty {
                scope: "realm dict",
                property: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SettingsEvent {
    Update {
        property: String,
        value: Value,
        #[serde(default)]
        language_name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColorScheme {
    Automatic,
    Dark,
    Light,
}

impl TryFrom<u8> for ColorScheme {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Automatic),
            2 => Ok(Self::Dark),
            3 => Ok(Self::Light),
            other => Err(format!("unknown color scheme {other}")),
        }
    }
}

impl From<ColorScheme> for u8 {
    fn from(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Automatic => 1,
            ColorScheme::Dark => 2,
            ColorScheme::Light => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserSettingProperty {
    TwentyFourHourTime(bool),
    ColorScheme(ColorScheme),
    Emojiset(String),
    DefaultLanguage(String),
    EnterSends(bool),
    LeftSideUserlist(bool),
    FluidLayoutWidth(bool),
    HighContrastMode(bool),
    StarredMessageCounts(bool),
    DisplayEmojiReactionUsers(bool),
    WebFontSizePx(u16),
    WebLineHeightPercent(u16),
    DemoteInactiveStreams(u8),
    Timezone(String),
}

impl UserSettingProperty {
    pub fn parse(property: &str, value: Value) -> Result<Self, ProtocolError> {
        match property {
            "twenty_four_hour_time" => Ok(Self::TwentyFourHourTime(typed(property, value)?)),
            "color_scheme" => Ok(Self::ColorScheme(typed(property, value)?)),
            "emojiset" => Ok(Self::Emojiset(typed(property, value)?)),
            "default_language" => Ok(Self::DefaultLanguage(typed(property, value)?)),
            "enter_sends" => Ok(Self::EnterSends(typed(property, value)?)),
            "left_side_userlist" => Ok(Self::LeftSideUserlist(typed(property, value)?)),
            "fluid_layout_width" => Ok(Self::FluidLayoutWidth(typed(property, value)?)),
            "high_contrast_mode" => Ok(Self::HighContrastMode(typed(property, value)?)),
            "starred_message_counts" => Ok(Self::StarredMessageCounts(typed(property, value)?)),
            "display_emoji_reaction_users" => {
                Ok(Self::DisplayEmojiReactionUsers(typed(property, value)?))
            }
            "web_font_size_px" => Ok(Self::WebFontSizePx(typed(property, value)?)),
            "web_line_height_percent" => Ok(Self::WebLineHeightPercent(typed(property, value)?)),
            "demote_inactive_streams" => Ok(Self::DemoteInactiveStreams(typed(property, value)?)),
            "timezone" => Ok(Self::Timezone(typed(property, value)?)),
            other => Err(ProtocolError::UnknownProperty {
                scope: "user_settings",
                property: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestartEvent {
    #[serde(default)]
    pub zulip_version: Option<String>,
    #[serde(default)]
    pub immediate: bool,
}

// ---------------------------------------------------------------------------
// register
// ---------------------------------------------------------------------------

/// Snapshot returned when registering an event queue.
///
/// Map-shaped sections are keyed by the decimal user id, as on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct InitialState {
    #[serde(default)]
    pub queue_id: Option<String>,
    #[serde(default = "default_last_event_id")]
    pub last_event_id: i64,
    pub user_id: UserId,
    #[serde(default)]
    pub realm_users: Vec<RawPerson>,
    #[serde(default)]
    pub realm_non_active_users: Vec<RawPerson>,
    #[serde(default)]
    pub subscriptions: Vec<RawSubscription>,
    #[serde(default)]
    pub unsubscribed: Vec<RawSubscription>,
    #[serde(default)]
    pub never_subscribed: Vec<RawStream>,
    #[serde(default)]
    pub realm_user_groups: Vec<RawUserGroup>,
    #[serde(default)]
    pub user_topics: Vec<UserTopicEvent>,
    #[serde(default)]
    pub user_status: BTreeMap<String, StatusPatch>,
    #[serde(default)]
    pub presences: BTreeMap<String, BTreeMap<String, ClientPresence>>,
    #[serde(default)]
    pub realm: Map<String, Value>,
    #[serde(default)]
    pub user_settings: Map<String, Value>,
    #[serde(default)]
    pub realm_user_settings_defaults: Map<String, Value>,
}

fn default_last_event_id() -> i64 {
    -1
}
