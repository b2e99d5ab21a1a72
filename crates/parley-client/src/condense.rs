//! Condensing and collapsing long messages.
//!
//! A message is in one of three display states: normal, condensed (clipped
//! with a "show more" control) or collapsed (hidden behind its header).
//! Collapsing is a persisted message flag; condensing is local and only
//! offered for messages taller than a fraction of the viewport.

use std::collections::HashMap;

use tracing::debug;

use parley_shared::constants::CONDENSE_VIEWPORT_RATIO;
use parley_shared::types::MessageId;

use crate::error::ClientError;
use crate::live_update::update_message_in_all_views;
use crate::message_list::ListId;
use crate::state::{FollowUp, Session};

/// Flip the collapsed flag of `id` in every mounted list.
///
/// Locally echoed messages cannot be collapsed yet; toggling one does
/// nothing. Returns whether anything changed.
pub fn toggle_collapse(session: &mut Session, id: MessageId) -> Result<bool, ClientError> {
    let message = session.stores.messages.get_mut(id)?;
    if message.locally_echoed {
        debug!(message_id = %id, "Ignoring collapse toggle on local echo");
        return Ok(false);
    }
    message.flags.collapsed = !message.flags.collapsed;
    let collapsed = message.flags.collapsed;

    update_message_in_all_views(session, &[id]);
    if !id.is_pending() {
        session.queue(FollowUp::SetCollapsed { id, collapsed });
    }
    Ok(true)
}

/// Switch `id` between condensed and fully expanded.
///
/// Only rows of the current list measured as condensable can be toggled.
pub fn toggle_condense(session: &mut Session, id: MessageId) -> Result<bool, ClientError> {
    let view = &session.lists.current().view;
    let currently_condensed = match view.row(id) {
        Some(row) if view.condensable.contains(&id) => row.condensed,
        _ => {
            debug!(message_id = %id, "Message cannot be condensed");
            return Ok(false);
        }
    };

    let message = session.stores.messages.get_mut(id)?;
    if message.flags.collapsed {
        return Ok(false);
    }
    message.condensed = Some(!currently_condensed);
    update_message_in_all_views(session, &[id]);
    Ok(true)
}

/// Recompute which rows of `list_id` are tall enough to condense, given the
/// measured row heights and the viewport height.
pub fn condense_and_collapse(
    session: &mut Session,
    list_id: ListId,
    heights: &HashMap<MessageId, f64>,
    viewport_height: f64,
) -> Result<(), ClientError> {
    let threshold = viewport_height * CONDENSE_VIEWPORT_RATIO;
    let list = session
        .lists
        .get_mut(list_id)
        .ok_or(ClientError::UnknownList(list_id))?;

    let mut changed = Vec::new();
    for (&id, &height) in heights {
        if !list.contains(id) {
            continue;
        }
        let condensable = height > threshold;
        let was = list.view.condensable.contains(&id);
        if was != condensable {
            list.set_condensable(id, condensable);
            changed.push(id);
        }
    }
    changed.sort();
    list.rerender_messages(&changed, &session.stores);
    Ok(())
}
