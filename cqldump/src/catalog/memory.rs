use std::collections::{btree_map::Entry, BTreeMap};

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

use super::{Catalog, RowStream};
use crate::schema::{Column, Keyspace, Table, UserType};

/// A catalog snapshot held in memory.
///
/// Used to dump from a RON snapshot file instead of a live cluster, and as
/// the fake catalog in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryCatalog {
    keyspaces: BTreeMap<String, MemoryKeyspace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryKeyspace {
    pub keyspace: Keyspace,
    #[serde(default)]
    pub types: Vec<UserType>,
    #[serde(default)]
    pub tables: BTreeMap<String, MemoryTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTable {
    pub table: Table,
    pub columns: Vec<Column>,
    /// Rows already serialized as `SELECT JSON` payloads.
    #[serde(default)]
    pub rows: Vec<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges every RON document of `data` into one catalog, later documents
    /// replacing keyspaces of the same name.
    pub fn load<'a>(data: impl IntoIterator<Item = &'a [u8]>) -> Result<Self> {
        let mut catalog = Self::new();

        for piece in data {
            let loaded = ron::de::from_bytes::<MemoryCatalog>(piece)?;
            catalog.keyspaces.extend(loaded.keyspaces);
        }

        Ok(catalog)
    }

    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Adds `keyspace`, replacing any keyspace of the same name.
    pub fn add_keyspace(&mut self, keyspace: Keyspace) -> &mut MemoryKeyspace {
        let name = keyspace.name.clone();
        upsert(
            &mut self.keyspaces,
            name,
            MemoryKeyspace {
                keyspace,
                types: Vec::new(),
                tables: BTreeMap::new(),
            },
        )
    }

    pub fn keyspace_mut(&mut self, name: &str) -> Option<&mut MemoryKeyspace> {
        self.keyspaces.get_mut(name)
    }

    fn keyspace(&self, name: &str) -> Result<&MemoryKeyspace> {
        self.keyspaces
            .get(name)
            .ok_or_else(|| eyre!("keyspace `{name}` does not exist"))
    }

    fn table(&self, keyspace: &str, table: &str) -> Result<&MemoryTable> {
        self.keyspace(keyspace)?
            .tables
            .get(table)
            .ok_or_else(|| eyre!("table `{keyspace}.{table}` does not exist"))
    }
}

impl MemoryKeyspace {
    pub fn add_type(&mut self, ty: UserType) -> &mut Self {
        self.types.push(ty);
        self
    }

    pub fn add_table(
        &mut self,
        table: Table,
        columns: impl IntoIterator<Item = Column>,
    ) -> &mut MemoryTable {
        let name = table.name.clone();
        upsert(
            &mut self.tables,
            name,
            MemoryTable {
                table,
                columns: columns.into_iter().collect(),
                rows: Vec::new(),
            },
        )
    }
}

impl MemoryTable {
    pub fn add_row(&mut self, json: impl Into<String>) -> &mut Self {
        self.rows.push(json.into());
        self
    }
}

fn upsert<V>(map: &mut BTreeMap<String, V>, key: String, value: V) -> &mut V {
    match map.entry(key) {
        Entry::Occupied(mut occupied) => {
            occupied.insert(value);
            occupied.into_mut()
        }
        Entry::Vacant(vacant) => vacant.insert(value),
    }
}

impl Catalog for MemoryCatalog {
    fn keyspaces(&self) -> Result<Vec<Keyspace>> {
        Ok(self
            .keyspaces
            .values()
            .map(|it| it.keyspace.clone())
            .collect())
    }

    fn types(&self, keyspace: &str) -> Result<Vec<UserType>> {
        Ok(self.keyspace(keyspace)?.types.clone())
    }

    fn tables(&self, keyspace: &str) -> Result<Vec<Table>> {
        Ok(self
            .keyspace(keyspace)?
            .tables
            .values()
            .map(|it| it.table.clone())
            .collect())
    }

    fn columns(&self, keyspace: &str, table: &str) -> Result<Vec<Column>> {
        Ok(self.table(keyspace, table)?.columns.clone())
    }

    fn rows(&self, keyspace: &str, table: &str) -> Result<RowStream<'_>> {
        let rows = &self.table(keyspace, table)?.rows;
        Ok(Box::new(rows.iter().cloned().map(Ok)))
    }
}
