//! Selection movement within a [`MessageList`].

use parley_shared::types::MessageId;

use crate::message_list::MessageList;

impl MessageList {
    pub fn selected(&self) -> Option<MessageId> {
        self.selected
    }

    /// Select `id` if the list contains it.
    pub fn select_id(&mut self, id: MessageId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn first(&mut self) -> Option<MessageId> {
        self.selected = self.items.first().copied().or(self.selected);
        self.selected
    }

    pub fn last(&mut self) -> Option<MessageId> {
        self.selected = self.items.last().copied().or(self.selected);
        self.selected
    }

    /// Move down one message; stays put at the bottom.
    pub fn next(&mut self) -> Option<MessageId> {
        self.move_by(1)
    }

    /// Move up one message; stays put at the top.
    pub fn prev(&mut self) -> Option<MessageId> {
        self.move_by(-1)
    }

    pub fn page_down(&mut self, rows_per_page: usize) -> Option<MessageId> {
        self.move_by(rows_per_page.max(1) as isize)
    }

    pub fn page_up(&mut self, rows_per_page: usize) -> Option<MessageId> {
        self.move_by(-(rows_per_page.max(1) as isize))
    }

    fn move_by(&mut self, delta: isize) -> Option<MessageId> {
        let Some(current) = self.selected.and_then(|id| self.items.binary_search(&id).ok()) else {
            return if delta >= 0 { self.first() } else { self.last() };
        };
        let last = self.items.len().saturating_sub(1) as isize;
        let target = (current as isize + delta).clamp(0, last) as usize;
        self.selected = self.items.get(target).copied();
        self.selected
    }

    /// The selected message was removed from index `pos`; pick the message
    /// that took its place, or the one before it at the end of the list.
    pub(crate) fn reselect_after_removal(&mut self, pos: usize) {
        self.selected = self
            .items
            .get(pos)
            .or_else(|| self.items.last())
            .copied();
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::Filter;
    use crate::message_list::{ListId, MessageList};
    use crate::test_support::stores_with_messages;
    use parley_shared::types::MessageId;

    fn list(ids: &[u64]) -> MessageList {
        let stores = stores_with_messages(ids);
        let mut list = MessageList::new(ListId(1), Filter::home());
        let ids: Vec<MessageId> = ids.iter().copied().map(MessageId::from).collect();
        list.add_messages(&ids, &stores);
        list
    }

    #[test]
    fn test_next_prev_clamp() {
        let mut list = list(&[10, 20, 30]);
        assert_eq!(list.next(), Some(MessageId::from(10)));
        assert_eq!(list.next(), Some(MessageId::from(20)));
        assert_eq!(list.last(), Some(MessageId::from(30)));
        assert_eq!(list.next(), Some(MessageId::from(30)));
        assert_eq!(list.page_up(10), Some(MessageId::from(10)));
        assert_eq!(list.prev(), Some(MessageId::from(10)));
    }

    #[test]
    fn test_select_unknown_id() {
        let mut list = list(&[10]);
        assert!(!list.select_id(MessageId::from(11)));
        assert_eq!(list.selected(), None);
    }

    #[test]
    fn test_deleting_selected_moves_to_neighbour() {
        let mut list = list(&[10, 20, 30]);
        list.select_id(MessageId::from(20));
        list.remove_messages(&[MessageId::from(20)]);
        assert_eq!(list.selected(), Some(MessageId::from(30)));

        list.remove_messages(&[MessageId::from(30)]);
        assert_eq!(list.selected(), Some(MessageId::from(10)));

        list.remove_messages(&[MessageId::from(10)]);
        assert_eq!(list.selected(), None);
    }
}
