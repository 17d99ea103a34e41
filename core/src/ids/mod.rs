use uuid::Uuid;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod generator;
pub use generator::IdGenerator;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random id. Prefer [`IdGenerator`] when ids must be reproducible.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Short form keeps log lines readable; the full uuid is in Debug.
                let simple = self.0.simple().to_string();
                write!(f, "{}:{}", $prefix, &simple[..8])
            }
        }
    };
}

typed_id!(
    /// Identifies a scalar unknown in a [`crate::variables::VariableStore`].
    VariableId,
    "var"
);

typed_id!(
    /// Identifies a draggable point.
    HandleId,
    "handle"
);

typed_id!(
    /// Identifies a high-level constraint.
    ConstraintId,
    "constraint"
);
