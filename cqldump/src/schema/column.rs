use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// One row of `system_schema.columns`, kept in its catalog-native shape.
///
/// `kind` and `clustering_order` stay raw strings here; the layout projector
/// is the single place that interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub keyspace: String,
    pub table: String,
    pub name: String,
    pub kind: String,
    /// Position within `kind` only. Regular and static columns carry `-1`.
    pub position: i32,
    pub clustering_order: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Column {
    pub fn new(
        keyspace: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        ty: impl Into<String>,
        kind: ColumnKind,
        position: i32,
    ) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
            name: name.into(),
            kind: kind.to_string(),
            position,
            clustering_order: ClusteringOrder::None.to_string(),
            ty: ty.into(),
        }
    }

    pub fn ordered(mut self, order: ClusteringOrder) -> Self {
        self.clustering_order = order.to_string();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
pub enum ColumnKind {
    #[display(fmt = "partition_key")]
    #[strum(serialize = "partition_key")]
    PartitionKey,
    #[display(fmt = "clustering")]
    #[strum(serialize = "clustering")]
    Clustering,
    #[display(fmt = "static")]
    #[strum(serialize = "static")]
    Static,
    #[display(fmt = "regular")]
    #[strum(serialize = "regular")]
    Regular,
}

impl ColumnKind {
    /// Primary key columns sort first; static and regular columns share a rank.
    pub fn rank(self) -> u8 {
        match self {
            ColumnKind::PartitionKey => 0,
            ColumnKind::Clustering => 1,
            ColumnKind::Static | ColumnKind::Regular => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ClusteringOrder {
    #[display(fmt = "asc")]
    Asc,
    #[display(fmt = "desc")]
    Desc,
    #[display(fmt = "none")]
    None,
}

impl ClusteringOrder {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            ClusteringOrder::Asc => Some("ASC"),
            ClusteringOrder::Desc => Some("DESC"),
            ClusteringOrder::None => None,
        }
    }
}
