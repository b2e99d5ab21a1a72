//! Organization-wide settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use parley_shared::protocol::RealmProperty;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RealmSettings {
    pub name: String,
    pub description: String,
    pub invite_required: bool,
    pub emails_restricted_to_domains: bool,
    pub allow_message_editing: bool,
    pub message_content_edit_limit_seconds: Option<u64>,
    pub waiting_period_threshold: u64,
    pub default_language: String,
    pub enable_spectator_access: bool,
    pub default_code_block_language: String,
    pub plan_type: u8,
    pub org_type: u16,
    pub message_retention_days: Option<i64>,
    pub icon_url: String,
    pub icon_source: String,
    pub logo_url: String,
    pub logo_source: String,
    pub night_logo_url: String,
    pub night_logo_source: String,
    pub deactivated: bool,
}

impl RealmSettings {
    /// Build from the `realm` section of the register snapshot; keys the
    /// client does not model are skipped.
    pub fn from_snapshot(section: &Map<String, Value>) -> Self {
        let mut realm = Self::default();
        for (key, value) in section {
            match RealmProperty::parse(key, value.clone()) {
                Ok(property) => {
                    realm.apply(property);
                }
                Err(e) => debug!(property = %key, error = %e, "Skipping realm property"),
            }
        }
        realm
    }

    /// Returns whether the value changed.
    pub fn apply(&mut self, property: RealmProperty) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
            let changed = *slot != value;
            *slot = value;
            changed
        }

        match property {
            RealmProperty::Name(v) => set(&mut self.name, v),
            RealmProperty::Description(v) => set(&mut self.description, v),
            RealmProperty::InviteRequired(v) => set(&mut self.invite_required, v),
            RealmProperty::EmailsRestrictedToDomains(v) => {
                set(&mut self.emails_restricted_to_domains, v)
            }
            RealmProperty::AllowMessageEditing(v) => set(&mut self.allow_message_editing, v),
            RealmProperty::MessageContentEditLimitSeconds(v) => {
                set(&mut self.message_content_edit_limit_seconds, v)
            }
            RealmProperty::WaitingPeriodThreshold(v) => set(&mut self.waiting_period_threshold, v),
            RealmProperty::DefaultLanguage(v) => set(&mut self.default_language, v),
            RealmProperty::EnableSpectatorAccess(v) => set(&mut self.enable_spectator_access, v),
            RealmProperty::DefaultCodeBlockLanguage(v) => {
                set(&mut self.default_code_block_language, v)
            }
            RealmProperty::PlanType(v) => set(&mut self.plan_type, v),
            RealmProperty::OrgType(v) => set(&mut self.org_type, v),
            RealmProperty::MessageRetentionDays(v) => set(&mut self.message_retention_days, v),
            RealmProperty::Icon { url, source } => {
                set(&mut self.icon_url, url) | set(&mut self.icon_source, source)
            }
            RealmProperty::Logo { url, source, night: false } => {
                set(&mut self.logo_url, url) | set(&mut self.logo_source, source)
            }
            RealmProperty::Logo { url, source, night: true } => {
                set(&mut self.night_logo_url, url) | set(&mut self.night_logo_source, source)
            }
        }
    }
}
