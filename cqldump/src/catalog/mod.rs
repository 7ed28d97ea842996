//! Read access to a cluster catalog.
//!
//! A [`Catalog`] is handed to the dumper explicitly, so the statement engine
//! never knows whether it talks to a live cluster or to a [`MemoryCatalog`].

pub mod memory;

pub use self::memory::MemoryCatalog;
use crate::schema::{Column, Keyspace, Table, UserType};

/// A lazy, single-pass cursor over `SELECT JSON *` payloads of one table.
///
/// The cursor ends either with `None` or after yielding an error.
pub type RowStream<'a> = Box<dyn Iterator<Item = eyre::Result<String>> + 'a>;

pub trait Catalog {
    fn keyspaces(&self) -> eyre::Result<Vec<Keyspace>>;

    fn types(&self, keyspace: &str) -> eyre::Result<Vec<UserType>>;

    /// Tables of `keyspace`; their columns are fetched separately.
    fn tables(&self, keyspace: &str) -> eyre::Result<Vec<Table>>;

    fn columns(&self, keyspace: &str, table: &str) -> eyre::Result<Vec<Column>>;

    fn rows(&self, keyspace: &str, table: &str) -> eyre::Result<RowStream<'_>>;
}

impl<'a, C: Catalog + ?Sized> Catalog for &'a C {
    fn keyspaces(&self) -> eyre::Result<Vec<Keyspace>> {
        (**self).keyspaces()
    }

    fn types(&self, keyspace: &str) -> eyre::Result<Vec<UserType>> {
        (**self).types(keyspace)
    }

    fn tables(&self, keyspace: &str) -> eyre::Result<Vec<Table>> {
        (**self).tables(keyspace)
    }

    fn columns(&self, keyspace: &str, table: &str) -> eyre::Result<Vec<Column>> {
        (**self).columns(keyspace, table)
    }

    fn rows(&self, keyspace: &str, table: &str) -> eyre::Result<RowStream<'_>> {
        (**self).rows(keyspace, table)
    }
}
