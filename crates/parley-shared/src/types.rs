use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{
    ROLE_ADMINISTRATOR, ROLE_GUEST, ROLE_MEMBER, ROLE_MODERATOR, ROLE_OWNER,
};
use crate::error::ProtocolError;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Server-assigned user identifier.
    UserId
);
numeric_id!(
    /// Server-assigned stream identifier.
    StreamId
);
numeric_id!(
    /// Server-assigned user group identifier.
    GroupId
);

/// Identity of a message row.
///
/// Messages sent from this client are rendered before the server confirms
/// them. Until then they carry a `Pending` id that sorts directly after the
/// newest confirmed id known at send time (`1234.01`, `1234.02`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    Confirmed(u64),
    Pending { after: u64, seq: u32 },
}

impl MessageId {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    pub fn confirmed(&self) -> Option<u64> {
        match self {
            Self::Confirmed(id) => Some(*id),
            Self::Pending { .. } => None,
        }
    }

    fn sort_key(&self) -> (u64, u32) {
        match *self {
            Self::Confirmed(id) => (id, 0),
            Self::Pending { after, seq } => (after, seq),
        }
    }
}

impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed(id) => write!(f, "{id}"),
            Self::Pending { after, seq } => write!(f, "{after}.{seq:02}"),
        }
    }
}

impl FromStr for MessageId {
    type Err = ProtocolError;

    /// Parses the textual row id, e.g. `"1234"` or `"1234.01"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidMessageId(s.to_string());
        match s.split_once('.') {
            None => s.parse::<u64>().map(Self::Confirmed).map_err(|_| invalid()),
            Some((after, seq)) => {
                let after = after.parse::<u64>().map_err(|_| invalid())?;
                let seq = seq.parse::<u32>().map_err(|_| invalid())?;
                if seq == 0 {
                    return Ok(Self::Confirmed(after));
                }
                Ok(Self::Pending { after, seq })
            }
        }
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self::Confirmed(id)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Confirmed(id) => serializer.serialize_u64(*id),
            Self::Pending { .. } => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MessageIdVisitor;

        impl<'de> Visitor<'de> for MessageIdVisitor {
            type Value = MessageId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a message id number or string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MessageId, E> {
                Ok(MessageId::Confirmed(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MessageId, E> {
                u64::try_from(v)
                    .map(MessageId::Confirmed)
                    .map_err(|_| E::custom(format!("negative message id {v}")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MessageId, E> {
                // Legacy float ids: two decimal digits of local sequence.
                format!("{v:.2}").parse().map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MessageId, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MessageIdVisitor)
    }
}

/// Organization role, as sent on the wire by its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Role {
    Owner,
    Administrator,
    Moderator,
    Member,
    Guest,
}

impl Role {
    pub fn code(self) -> u16 {
        match self {
            Self::Owner => ROLE_OWNER,
            Self::Administrator => ROLE_ADMINISTRATOR,
            Self::Moderator => ROLE_MODERATOR,
            Self::Member => ROLE_MEMBER,
            Self::Guest => ROLE_GUEST,
        }
    }

    pub fn is_owner(self) -> bool {
        self == Self::Owner
    }

    /// Owners are administrators too.
    pub fn is_admin(self) -> bool {
        self == Self::Administrator || self.is_owner()
    }

    pub fn is_moderator(self) -> bool {
        self == Self::Moderator
    }

    pub fn is_guest(self) -> bool {
        self == Self::Guest
    }
}

impl TryFrom<u16> for Role {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            ROLE_OWNER => Ok(Self::Owner),
            ROLE_ADMINISTRATOR => Ok(Self::Administrator),
            ROLE_MODERATOR => Ok(Self::Moderator),
            ROLE_MEMBER => Ok(Self::Member),
            ROLE_GUEST => Ok(Self::Guest),
            other => Err(ProtocolError::UnknownRole(other)),
        }
    }
}

impl From<Role> for u16 {
    fn from(role: Role) -> Self {
        role.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row_ids() {
        assert_eq!("1234".parse::<MessageId>().unwrap(), MessageId::Confirmed(1234));
        assert_eq!(
            "1234.01".parse::<MessageId>().unwrap(),
            MessageId::Pending { after: 1234, seq: 1 }
        );
        assert!("abc".parse::<MessageId>().is_err());
        assert!("12.x".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_pending_ids_sort_between_confirmed() {
        let before = MessageId::Confirmed(1234);
        let pending = MessageId::Pending { after: 1234, seq: 2 };
        let after = MessageId::Confirmed(1235);
        assert!(before < pending);
        assert!(pending < after);
        assert_eq!(pending.to_string(), "1234.02");
    }

    #[test]
    fn test_message_id_json_forms() {
        let confirmed: MessageId = serde_json::from_str("77").unwrap();
        assert_eq!(confirmed, MessageId::Confirmed(77));
        let pending: MessageId = serde_json::from_str("\"77.03\"").unwrap();
        assert_eq!(pending, MessageId::Pending { after: 77, seq: 3 });
        let float: MessageId = serde_json::from_str("77.01").unwrap();
        assert_eq!(float, MessageId::Pending { after: 77, seq: 1 });
        assert_eq!(serde_json::to_string(&pending).unwrap(), "\"77.03\"");
    }

    #[test]
    fn test_role_derived_flags() {
        assert!(Role::Owner.is_admin());
        assert!(Role::Owner.is_owner());
        assert!(!Role::Administrator.is_owner());
        assert!(Role::Administrator.is_admin());
        assert!(!Role::Moderator.is_admin());
        assert!(Role::Guest.is_guest());
        assert_eq!(Role::try_from(400).unwrap(), Role::Member);
        assert!(Role::try_from(123).is_err());
    }
}
