use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The type of a stored object.
///
/// The discriminants are the type numbers used in pack entry headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Snapshot of a tree plus history metadata.
    Commit = 1,
    /// Directory listing.
    Tree = 2,
    /// Raw content.
    Blob = 3,
    /// Annotated tag.
    Tag = 4,
}

impl ObjectType {
    /// Every object type, in pack type-number order.
    pub const ALL: [ObjectType; 4] = [Self::Commit, Self::Tree, Self::Blob, Self::Tag];

    /// The canonical name used in the hashed object header.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    /// The 3-bit type number written into pack entry headers.
    pub const fn pack_type(self) -> u8 {
        self as u8
    }

    /// Parse a pack type number. Delta types (6, 7) and reserved values
    /// return `None`.
    pub fn from_pack_type(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObjectType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| TypeError::UnknownObjectType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_type_numbers() {
        assert_eq!(ObjectType::Commit.pack_type(), 1);
        assert_eq!(ObjectType::Tree.pack_type(), 2);
        assert_eq!(ObjectType::Blob.pack_type(), 3);
        assert_eq!(ObjectType::Tag.pack_type(), 4);
    }

    #[test]
    fn from_pack_type_rejects_deltas_and_reserved() {
        for kind in ObjectType::ALL {
            assert_eq!(ObjectType::from_pack_type(kind.pack_type()), Some(kind));
        }
        assert!(ObjectType::from_pack_type(0).is_none());
        assert!(ObjectType::from_pack_type(5).is_none());
        assert!(ObjectType::from_pack_type(6).is_none());
        assert!(ObjectType::from_pack_type(7).is_none());
    }

    #[test]
    fn parse_names() {
        assert_eq!("blob".parse::<ObjectType>().unwrap(), ObjectType::Blob);
        assert_eq!("tag".parse::<ObjectType>().unwrap(), ObjectType::Tag);
        let err = "delta".parse::<ObjectType>().unwrap_err();
        assert_eq!(err, TypeError::UnknownObjectType("delta".into()));
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(ObjectType::Commit.to_string(), "commit");
        assert_eq!(format!("{}", ObjectType::Tree), "tree");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ObjectType::Blob).unwrap();
        assert_eq!(json, "\"blob\"");
        let parsed: ObjectType = serde_json::from_str("\"commit\"").unwrap();
        assert_eq!(parsed, ObjectType::Commit);
    }
}
