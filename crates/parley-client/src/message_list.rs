//! A filtered, ordered message list and its rendered view.
//!
//! The view keeps one [`RenderedRow`] per listed message. Global changes
//! (theme, clock format) go through [`MessageList::rerender_view`]; targeted
//! changes (one sender renamed, one message starred) go through
//! [`MessageList::rerender_messages`]. Both produce identical rows.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use parley_shared::types::MessageId;
use parley_store::{Message, Stores};

use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListId(pub u64);

impl ListId {
    pub const HOME: ListId = ListId(0);
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::HOME {
            write!(f, "home")
        } else {
            write!(f, "list-{}", self.0)
        }
    }
}

/// Display state of one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    pub id: MessageId,
    /// Row identity as the host sees it, e.g. `"1234"` or `"1234.01"`.
    pub zid: String,
    pub sender_name: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub topic: Option<String>,
    pub time: String,
    pub starred: bool,
    pub collapsed: bool,
    pub condensed: bool,
    pub condensable: bool,
    pub reactions: usize,
    pub edited: bool,
    pub locally_echoed: bool,
}

impl RenderedRow {
    fn render(message: &Message, condensable: bool, twenty_four_hour_time: bool) -> Self {
        let collapsed = message.flags.collapsed;
        let condensed = !collapsed && message.condensed.unwrap_or(condensable);
        let format = if twenty_four_hour_time { "%H:%M" } else { "%-I:%M %p" };
        Self {
            id: message.id,
            zid: message.id.to_string(),
            sender_name: message.sender_full_name.clone(),
            avatar_url: message.avatar_url.clone(),
            content: message.content.clone(),
            topic: message.topic().map(str::to_string),
            time: message.timestamp.format(format).to_string(),
            starred: message.flags.starred,
            collapsed,
            condensed,
            condensable,
            reactions: message.reactions.len(),
            edited: message.last_edit_timestamp.is_some(),
            locally_echoed: message.locally_echoed,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListView {
    pub attached: bool,
    pub visible: bool,
    pub focused: bool,
    pub(crate) rows: Vec<RenderedRow>,
    pub(crate) condensable: HashSet<MessageId>,
    pub(crate) full_renders: u32,
    pub(crate) row_renders: u32,
}

impl ListView {
    pub fn rows(&self) -> &[RenderedRow] {
        &self.rows
    }

    pub fn row(&self, id: MessageId) -> Option<&RenderedRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// Number of whole-view renders so far.
    pub fn full_renders(&self) -> u32 {
        self.full_renders
    }

    /// Number of single rows re-rendered so far.
    pub fn row_renders(&self) -> u32 {
        self.row_renders
    }
}

#[derive(Debug)]
pub struct MessageList {
    pub(crate) id: ListId,
    pub(crate) filter: Filter,
    pub(crate) items: Vec<MessageId>,
    pub(crate) selected: Option<MessageId>,
    pub view: ListView,
    pub(crate) cancel: CancellationToken,
}

impl MessageList {
    pub fn new(id: ListId, filter: Filter) -> Self {
        Self {
            id,
            filter,
            items: Vec::new(),
            selected: None,
            view: ListView::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ListId {
        self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn items(&self) -> &[MessageId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.items.binary_search(&id).is_ok()
    }

    /// Token cancelled when the list is detached.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_detached(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Insert messages in id order, rendering each new row.
    ///
    /// Already-listed ids are skipped. Returns the ids actually added.
    pub fn add_messages(&mut self, ids: &[MessageId], stores: &Stores) -> Vec<MessageId> {
        let mut added = Vec::new();
        for &id in ids {
            let Err(pos) = self.items.binary_search(&id) else {
                continue;
            };
            self.items.insert(pos, id);
            added.push(id);
            if self.is_detached() {
                continue;
            }
            if let Some(row) = self.render_row(id, stores) {
                let row_pos = self.view.rows.partition_point(|r| r.id < id);
                self.view.rows.insert(row_pos, row);
                self.view.row_renders += 1;
            }
        }
        if !added.is_empty() {
            debug!(list = %self.id, count = added.len(), "Added messages to list");
        }
        added
    }

    /// Remove messages and their rows, moving the selection to the nearest
    /// surviving message if it was removed.
    pub fn remove_messages(&mut self, ids: &[MessageId]) -> usize {
        let mut removed = 0;
        for id in ids {
            let Ok(pos) = self.items.binary_search(id) else {
                continue;
            };
            self.items.remove(pos);
            self.view.rows.retain(|r| r.id != *id);
            self.view.condensable.remove(id);
            if self.selected == Some(*id) {
                self.reselect_after_removal(pos);
            }
            removed += 1;
        }
        removed
    }

    /// Swap a local echo's placeholder id for the confirmed id.
    pub fn replace_id(&mut self, old: MessageId, new: MessageId, stores: &Stores) {
        if !self.contains(old) {
            return;
        }
        let was_selected = self.selected == Some(old);
        let condensable = self.view.condensable.remove(&old);
        if let Ok(pos) = self.items.binary_search(&old) {
            self.items.remove(pos);
        }
        self.view.rows.retain(|r| r.id != old);
        if condensable {
            self.view.condensable.insert(new);
        }
        self.add_messages(&[new], stores);
        if was_selected {
            self.selected = Some(new);
        }
    }

    /// Rebuild every row from the message cache.
    pub fn rerender_view(&mut self, stores: &Stores) {
        if self.is_detached() {
            return;
        }
        let rows: Vec<RenderedRow> = self
            .items
            .iter()
            .filter_map(|&id| self.render_row(id, stores))
            .collect();
        self.view.rows = rows;
        self.view.full_renders += 1;
    }

    /// Rebuild only the rows of `ids` that this list shows.
    pub fn rerender_messages(&mut self, ids: &[MessageId], stores: &Stores) {
        if self.is_detached() {
            return;
        }
        for &id in ids {
            let Some(pos) = self.view.rows.iter().position(|r| r.id == id) else {
                continue;
            };
            if let Some(row) = self.render_row(id, stores) {
                self.view.rows[pos] = row;
                self.view.row_renders += 1;
            }
        }
    }

    pub fn set_condensable(&mut self, id: MessageId, condensable: bool) {
        if condensable {
            self.view.condensable.insert(id);
        } else {
            self.view.condensable.remove(&id);
        }
    }

    /// Drop the rendered rows and cancel everything tied to this list.
    pub fn detach(&mut self) {
        debug!(list = %self.id, "Detaching message list");
        self.view.attached = false;
        self.view.visible = false;
        self.view.focused = false;
        self.view.rows.clear();
        self.cancel.cancel();
    }

    fn render_row(&self, id: MessageId, stores: &Stores) -> Option<RenderedRow> {
        let message = stores.messages.get(id)?;
        Some(RenderedRow::render(
            message,
            self.view.condensable.contains(&id),
            stores.user_settings.twenty_four_hour_time,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stores_with_messages, stream_message};

    #[test]
    fn test_targeted_and_full_render_agree() {
        let mut stores = stores_with_messages(&[1, 2, 3]);
        let mut list = MessageList::new(ListId(1), Filter::home());
        let ids: Vec<MessageId> = [3u64, 1, 2].into_iter().map(MessageId::from).collect();
        list.add_messages(&ids, &stores);
        assert_eq!(list.items(), &[MessageId::from(1), MessageId::from(2), MessageId::from(3)]);

        stores.messages.get_mut(MessageId::from(2)).unwrap().sender_full_name = "Renamed".into();
        list.rerender_messages(&[MessageId::from(2)], &stores);
        let targeted = list.view.rows().to_vec();

        list.rerender_view(&stores);
        assert_eq!(list.view.rows(), targeted.as_slice());
        assert_eq!(list.view.row(MessageId::from(2)).unwrap().sender_name, "Renamed");
        assert_eq!(list.view.full_renders(), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let stores = stores_with_messages(&[1]);
        let mut list = MessageList::new(ListId(1), Filter::home());
        assert_eq!(list.add_messages(&[MessageId::from(1)], &stores).len(), 1);
        assert!(list.add_messages(&[MessageId::from(1)], &stores).is_empty());
        assert_eq!(list.view.rows().len(), 1);
    }

    #[test]
    fn test_detached_list_stops_rendering() {
        let stores = stores_with_messages(&[1, 2]);
        let mut list = MessageList::new(ListId(1), Filter::home());
        list.add_messages(&[MessageId::from(1)], &stores);
        let token = list.cancel_token();

        list.detach();
        assert!(token.is_cancelled());
        assert!(list.view.rows().is_empty());

        list.add_messages(&[MessageId::from(2)], &stores);
        list.rerender_view(&stores);
        assert!(list.view.rows().is_empty());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_replace_local_echo_id() {
        let mut stores = stores_with_messages(&[]);
        let local = MessageId::Pending { after: 0, seq: 1 };
        let mut echo = stream_message(0, 1, 1, "t");
        echo.id = local;
        stores.messages.insert(echo);
        stores.messages.insert(stream_message(7, 1, 1, "t"));

        let mut list = MessageList::new(ListId(1), Filter::home());
        list.add_messages(&[local], &stores);
        list.select_id(local);
        list.replace_id(local, MessageId::from(7), &stores);

        assert_eq!(list.items(), &[MessageId::from(7)]);
        assert_eq!(list.selected(), Some(MessageId::from(7)));
        assert_eq!(list.view.rows()[0].zid, "7");
    }
}
