pub mod catalog;
pub mod cql;
pub mod dump;
pub mod error;
pub mod filter;
pub mod schema;

pub use catalog::{memory::MemoryCatalog, Catalog, RowStream};
pub use dump::{DumpOptions, DumpReport, Dumper};
pub use error::DumpError;
pub use filter::{DumpFilter, SYSTEM_KEYSPACES};
