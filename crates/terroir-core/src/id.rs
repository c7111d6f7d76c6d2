//! Strongly-typed identifiers.
//!
//! Every entity id is a UUID, but each entity gets its own newtype so a site
//! id can never be handed to something expecting a region id.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub Uuid);

    impl $name {
      /// A fresh random (v4) identifier.
      pub fn generate() -> Self { Self(Uuid::new_v4()) }

      pub fn as_uuid(&self) -> Uuid { self.0 }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self { Self(id) }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
      }
    }

    impl FromStr for $name {
      type Err = crate::Error;

      fn from_str(s: &str) -> crate::Result<Self> { Ok(Self(Uuid::parse_str(s)?)) }
    }
  };
}

id_type!(
  /// Identifies an administrative region.
  RegionId
);
id_type!(
  /// Identifies an agricultural site.
  SiteId
);
id_type!(
  /// Identifies a recorded activity.
  ActivityId
);
id_type!(
  /// Identifies a user account (and therefore a principal).
  UserId
);

/// Render a list of ids as `a, b, c` for diagnostics.
pub fn join_ids<'a, T, I>(ids: I) -> String
where
  T: fmt::Display + 'a,
  I: IntoIterator<Item = &'a T>,
{
  ids
    .into_iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ")
}
