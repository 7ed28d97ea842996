use std::collections::BTreeSet;

use crate::schema::Keyspace;

/// Keyspaces the server manages itself; replaying them on another cluster
/// is never wanted.
pub const SYSTEM_KEYSPACES: [&str; 7] = [
    "system",
    "system_auth",
    "system_distributed",
    "system_schema",
    "system_traces",
    "system_views",
    "system_virtual_schema",
];

/// Include/exclude selection of keyspaces and table data.
///
/// Names are exact and case-sensitive. A non-empty include set limits the
/// dump to its keyspaces; the exclude set always wins. Exclude entries of
/// the form `keyspace.table` only suppress that table's rows, its schema is
/// still dumped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpFilter {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl DumpFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exclude_system(mut self) -> Self {
        self.exclude
            .extend(SYSTEM_KEYSPACES.iter().map(|it| it.to_string()));
        self
    }

    pub fn includes_keyspace(&self, keyspace: &str) -> bool {
        (self.include.is_empty() || self.include.contains(keyspace))
            && !self.exclude.contains(keyspace)
    }

    /// Keeps the eligible keyspaces, preserving catalog order.
    pub fn select(&self, keyspaces: impl IntoIterator<Item = Keyspace>) -> Vec<Keyspace> {
        keyspaces
            .into_iter()
            .filter(|it| self.includes_keyspace(&it.name))
            .collect()
    }

    pub fn includes_table_data(&self, keyspace: &str, table: &str) -> bool {
        !self.exclude.contains(&format!("{keyspace}.{table}"))
    }
}
