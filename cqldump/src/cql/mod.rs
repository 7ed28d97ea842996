pub mod layout;
pub mod literal;
pub mod statement;

pub use self::{
    layout::{ClusteringOrderBy, PartitionKey, PrimaryKey, ProjectedColumn, TableLayout},
    statement::{CreateKeyspace, CreateTable, CreateType, InsertJson},
};
