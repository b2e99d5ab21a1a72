//! Registry of mounted message lists.
//!
//! The home list is always mounted. At most one other list (a narrow) is
//! current at a time; while it is, home stays mounted but hidden.

use tracing::info;

use parley_store::Stores;

use crate::filter::Filter;
use crate::message_list::{ListId, MessageList};

#[derive(Debug)]
pub struct MessageLists {
    home: MessageList,
    current: Option<MessageList>,
    next_id: u64,
}

impl Default for MessageLists {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLists {
    pub fn new() -> Self {
        let mut home = MessageList::new(ListId::HOME, Filter::home());
        home.view.attached = true;
        home.view.visible = true;
        home.view.focused = true;
        Self {
            home,
            current: None,
            next_id: 1,
        }
    }

    /// Create an unmounted list for `filter`, pre-filled with every cached
    /// message it matches locally.
    pub fn create_list(&mut self, filter: Filter, stores: &Stores) -> MessageList {
        let id = ListId(self.next_id);
        self.next_id += 1;
        let mut list = MessageList::new(id, filter);
        if list.filter().can_apply_locally() {
            let mut ids: Vec<_> = stores
                .messages
                .iter()
                .filter(|m| list.filter().matches(m))
                .map(|m| m.id)
                .collect();
            ids.sort();
            list.add_messages(&ids, stores);
        }
        list
    }

    /// Make `next` the current list, or return to home with `None`.
    ///
    /// Home is only hidden and unfocused, never detached. An outgoing
    /// non-home list is detached and handed back to the caller.
    pub fn update_current_message_list(&mut self, next: Option<MessageList>) -> Option<MessageList> {
        let outgoing = self.current.take().map(|mut list| {
            list.detach();
            list
        });

        match next {
            Some(mut list) => {
                self.home.view.visible = false;
                self.home.view.focused = false;
                list.view.attached = true;
                list.view.visible = true;
                list.view.focused = true;
                info!(list = %list.id(), "Switched message list");
                self.current = Some(list);
            }
            None => {
                self.home.view.attached = true;
                self.home.view.visible = true;
                self.home.view.focused = true;
                info!("Switched to home view");
            }
        }

        outgoing
    }

    /// The list the user is looking at.
    pub fn current(&self) -> &MessageList {
        self.current.as_ref().unwrap_or(&self.home)
    }

    pub fn current_mut(&mut self) -> &mut MessageList {
        self.current.as_mut().unwrap_or(&mut self.home)
    }

    pub fn home(&self) -> &MessageList {
        &self.home
    }

    pub fn home_mut(&mut self) -> &mut MessageList {
        &mut self.home
    }

    pub fn is_current(&self, id: ListId) -> bool {
        self.current().id() == id
    }

    /// Whether `id` is the current list and is a narrow rather than home.
    pub fn is_current_narrow(&self, id: ListId) -> bool {
        self.current.as_ref().is_some_and(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: ListId) -> Option<&mut MessageList> {
        if id == ListId::HOME {
            return Some(&mut self.home);
        }
        self.current.as_mut().filter(|l| l.id() == id)
    }

    /// `[home]`, or `[home, current]` while narrowed.
    pub fn all_rendered_message_lists(&self) -> Vec<&MessageList> {
        let mut lists = vec![&self.home];
        lists.extend(self.current.as_ref());
        lists
    }

    pub fn all_rendered_message_lists_mut(&mut self) -> Vec<&mut MessageList> {
        let mut lists = vec![&mut self.home];
        lists.extend(self.current.as_mut());
        lists
    }
}
