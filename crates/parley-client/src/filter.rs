//! Narrows: the filter behind each message list.

use serde_json::Value;

use parley_shared::protocol::Recipient;
use parley_shared::types::{StreamId, UserId};
use parley_store::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Home,
    Stream(StreamId),
    Topic { stream_id: StreamId, topic: String },
    /// A direct-message conversation with exactly these participants,
    /// the session user included.
    Direct(Vec<UserId>),
    Sender(UserId),
    Starred,
    /// Full-text search; only the server can evaluate it.
    Search(String),
}

#[derive(Debug)]
struct WireTerm {
    operator: &'static str,
    operand: Value,
}

/// Conjunction of [`Term`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    pub fn new(terms: Vec<Term>) -> Self {
        let terms = terms
            .into_iter()
            .map(|term| match term {
                Term::Direct(mut ids) => {
                    ids.sort();
                    ids.dedup();
                    Term::Direct(ids)
                }
                other => other,
            })
            .collect();
        Self { terms }
    }

    pub fn home() -> Self {
        Self {
            terms: vec![Term::Home],
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_home(&self) -> bool {
        self.terms.is_empty() || self.terms == [Term::Home]
    }

    /// Whether [`Filter::matches`] gives the server's answer.
    pub fn can_apply_locally(&self) -> bool {
        !self.terms.iter().any(|t| matches!(t, Term::Search(_)))
    }

    /// Evaluate every locally decidable term; search terms are ignored.
    pub fn matches(&self, message: &Message) -> bool {
        self.terms.iter().all(|term| term_matches(term, message))
    }

    /// Wire form: `[{"operator": ..., "operand": ...}, ...]`.
    pub fn to_narrow(&self) -> Vec<Value> {
        let mut out = Vec::new();
        for term in &self.terms {
            let wire = match term {
                Term::Home => WireTerm { operator: "in", operand: "home".into() },
                Term::Stream(id) => WireTerm { operator: "stream", operand: id.0.into() },
                Term::Topic { stream_id, topic } => {
                    out.push(wire_value(WireTerm { operator: "stream", operand: stream_id.0.into() }));
                    WireTerm { operator: "topic", operand: topic.as_str().into() }
                }
                Term::Direct(ids) => WireTerm {
                    operator: "dm",
                    operand: ids.iter().map(|id| Value::from(id.0)).collect(),
                },
                Term::Sender(id) => WireTerm { operator: "sender", operand: id.0.into() },
                Term::Starred => WireTerm { operator: "is", operand: "starred".into() },
                Term::Search(q) => WireTerm { operator: "search", operand: q.as_str().into() },
            };
            out.push(wire_value(wire));
        }
        out
    }
}

fn wire_value(term: WireTerm) -> Value {
    serde_json::json!({ "operator": term.operator, "operand": term.operand })
}

fn term_matches(term: &Term, message: &Message) -> bool {
    match term {
        Term::Home | Term::Search(_) => true,
        Term::Stream(id) => message.stream_id() == Some(*id),
        Term::Topic { stream_id, topic } => match &message.recipient {
            Recipient::Stream { stream_id: sid, topic: t } => {
                sid == stream_id && t.eq_ignore_ascii_case(topic)
            }
            Recipient::Direct { .. } => false,
        },
        Term::Direct(ids) => match &message.recipient {
            Recipient::Direct { user_ids } => {
                let mut participants = user_ids.clone();
                participants.push(message.sender_id);
                participants.sort();
                participants.dedup();
                participants == *ids
            }
            Recipient::Stream { .. } => false,
        },
        Term::Sender(id) => message.sender_id == *id,
        Term::Starred => message.flags.starred,
    }
}
