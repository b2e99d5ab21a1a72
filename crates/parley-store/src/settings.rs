//! Personal display settings; the same shape holds the realm-wide
//! defaults for new users.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use parley_shared::protocol::{ColorScheme, UserSettingProperty};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub twenty_four_hour_time: bool,
    pub color_scheme: ColorScheme,
    pub emojiset: String,
    pub default_language: String,
    pub enter_sends: bool,
    pub left_side_userlist: bool,
    pub fluid_layout_width: bool,
    pub high_contrast_mode: bool,
    pub starred_message_counts: bool,
    pub display_emoji_reaction_users: bool,
    pub web_font_size_px: u16,
    pub web_line_height_percent: u16,
    pub demote_inactive_streams: u8,
    pub timezone: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            twenty_four_hour_time: false,
            color_scheme: ColorScheme::Automatic,
            emojiset: "google".into(),
            default_language: "en".into(),
            enter_sends: false,
            left_side_userlist: false,
            fluid_layout_width: false,
            high_contrast_mode: false,
            starred_message_counts: true,
            display_emoji_reaction_users: true,
            web_font_size_px: 16,
            web_line_height_percent: 140,
            demote_inactive_streams: 1,
            timezone: String::new(),
        }
    }
}

impl UserSettings {
    pub fn from_snapshot(section: &Map<String, Value>) -> Self {
        let mut settings = Self::default();
        for (key, value) in section {
            match UserSettingProperty::parse(key, value.clone()) {
                Ok(property) => {
                    settings.apply(property);
                }
                Err(e) => debug!(property = %key, error = %e, "Skipping user setting"),
            }
        }
        settings
    }

    /// Returns whether the value changed.
    pub fn apply(&mut self, property: UserSettingProperty) -> bool {
        fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
            let changed = *slot != value;
            *slot = value;
            changed
        }

        match property {
            UserSettingProperty::TwentyFourHourTime(v) => set(&mut self.twenty_four_hour_time, v),
            UserSettingProperty::ColorScheme(v) => set(&mut self.color_scheme, v),
            UserSettingProperty::Emojiset(v) => set(&mut self.emojiset, v),
            UserSettingProperty::DefaultLanguage(v) => set(&mut self.default_language, v),
            UserSettingProperty::EnterSends(v) => set(&mut self.enter_sends, v),
            UserSettingProperty::LeftSideUserlist(v) => set(&mut self.left_side_userlist, v),
            UserSettingProperty::FluidLayoutWidth(v) => set(&mut self.fluid_layout_width, v),
            UserSettingProperty::HighContrastMode(v) => set(&mut self.high_contrast_mode, v),
            UserSettingProperty::StarredMessageCounts(v) => {
                set(&mut self.starred_message_counts, v)
            }
            UserSettingProperty::DisplayEmojiReactionUsers(v) => {
                set(&mut self.display_emoji_reaction_users, v)
            }
            UserSettingProperty::WebFontSizePx(v) => set(&mut self.web_font_size_px, v),
            UserSettingProperty::WebLineHeightPercent(v) => {
                set(&mut self.web_line_height_percent, v)
            }
            UserSettingProperty::DemoteInactiveStreams(v) => {
                set(&mut self.demote_inactive_streams, v)
            }
            UserSettingProperty::Timezone(v) => set(&mut self.timezone, v),
        }
    }
}
