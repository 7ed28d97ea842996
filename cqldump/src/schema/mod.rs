//! Read-only projections of the `system_schema` catalog.
//!
//! Everything here is fetched once per keyspace and never written back.

pub mod column;
pub mod keyspace;
pub mod table;
pub mod user_type;

pub use self::{
    column::{ClusteringOrder, Column, ColumnKind},
    keyspace::Keyspace,
    table::{Table, TableOptions},
    user_type::UserType,
};
