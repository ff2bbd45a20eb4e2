use uuid::Uuid;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(transparent))]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Primary key of a `storage_roots` row.
    StorageRootId
);
row_id!(
    /// Primary key of a `files` row.
    FileId
);
row_id!(
    /// Primary key of a `media_items` row.
    MediaItemId
);
row_id!(
    /// Primary key of a `media_types` row.
    MediaTypeId
);
row_id!(
    /// Primary key of a `rename_events` row.
    RenameEventId
);

/// Identifier assigned to a scan job when it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanJobId(pub Uuid);

impl Default for ScanJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanJobId {
    pub fn new() -> Self {
        ScanJobId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ScanJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_and_ordered() {
        let first = ScanJobId::new();
        let second = ScanJobId::new();
        assert_ne!(first, second);
        assert!(first < second);
    }
}
