use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(PatchId);

/// Marker prefixed to patch ids that live on the internal review instance.
pub const INTERNAL_PATCH_MARKER: char = '*';

impl PatchId {
    pub fn internal(number: &str) -> Self {
        Self(format!("{INTERNAL_PATCH_MARKER}{number}"))
    }

    pub fn is_internal(&self) -> bool {
        self.0.starts_with(INTERNAL_PATCH_MARKER)
    }
}

/// Splits a user supplied patch list on commas and whitespace, keeping order.
pub fn parse_patch_list(raw: &str) -> Vec<PatchId> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(PatchId::from_str)
        .collect()
}
