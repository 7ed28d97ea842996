//! Column projection and primary key reconstruction.
//!
//! Catalog positions restart at zero for every column kind, so a column is
//! ordered by `(kind rank, position)` with both kept as separate fields.
//! Ties (regular and static columns all sit at `-1`) fall back to the name.

use std::fmt;

use crate::{
    cql::literal::Ident,
    error::LayoutError,
    schema::{ClusteringOrder, Column, ColumnKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn<'a> {
    pub column: &'a Column,
    pub kind: ColumnKind,
    /// Always `Asc` or `Desc` for clustering columns, `None` otherwise.
    pub order: ClusteringOrder,
}

impl<'a> ProjectedColumn<'a> {
    fn project(column: &'a Column) -> Result<Self, LayoutError> {
        let kind = column
            .kind
            .parse::<ColumnKind>()
            .map_err(|_| LayoutError::UnknownKind {
                column: column.name.clone(),
                kind: column.kind.clone(),
            })?;

        let order = match kind {
            ColumnKind::Clustering => match column.clustering_order.parse() {
                Ok(order @ (ClusteringOrder::Asc | ClusteringOrder::Desc)) => order,
                _ => {
                    return Err(LayoutError::UnknownClusteringOrder {
                        column: column.name.clone(),
                        order: column.clustering_order.clone(),
                    })
                }
            },
            _ => ClusteringOrder::None,
        };

        Ok(Self {
            column,
            kind,
            order,
        })
    }

    pub fn name(&self) -> &'a str {
        &self.column.name
    }

    pub fn ty(&self) -> &'a str {
        &self.column.ty
    }

    pub fn sort_key(&self) -> (u8, i32, &'a str) {
        (self.kind.rank(), self.column.position, &self.column.name)
    }
}

/// The columns of one table in statement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout<'a> {
    columns: Vec<ProjectedColumn<'a>>,
}

impl<'a> TableLayout<'a> {
    pub fn project(columns: &'a [Column]) -> Result<Self, LayoutError> {
        let mut columns = columns
            .iter()
            .map(ProjectedColumn::project)
            .collect::<Result<Vec<_>, _>>()?;

        if !columns.iter().any(|it| it.kind == ColumnKind::PartitionKey) {
            return Err(LayoutError::MissingPartitionKey);
        }

        columns.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ProjectedColumn<'a>] {
        &self.columns
    }

    fn of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &ProjectedColumn<'a>> + '_ {
        self.columns.iter().filter(move |it| it.kind == kind)
    }

    pub fn primary_key(&self) -> PrimaryKey<'a> {
        let partition = self
            .of_kind(ColumnKind::PartitionKey)
            .map(ProjectedColumn::name)
            .collect();
        let clustering = self
            .of_kind(ColumnKind::Clustering)
            .map(|it| (it.name(), it.order))
            .collect();

        PrimaryKey {
            partition: PartitionKey::from_definition(partition),
            clustering,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKey<'a> {
    Simple(&'a str),
    Composite(Vec<&'a str>),
}

impl<'a> PartitionKey<'a> {
    /// `names` holds at least one column, which the projector guarantees.
    fn from_definition(mut names: Vec<&'a str>) -> Self {
        match names.len() {
            1 => PartitionKey::Simple(names.remove(0)),
            _ => PartitionKey::Composite(names),
        }
    }

    pub fn count(&self) -> usize {
        match self {
            PartitionKey::Simple(_) => 1,
            PartitionKey::Composite(names) => names.len(),
        }
    }
}

impl fmt::Display for PartitionKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::Simple(name) => Ident(name).fmt(f),
            PartitionKey::Composite(names) => {
                f.write_str("(")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    Ident(name).fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey<'a> {
    pub partition: PartitionKey<'a>,
    pub clustering: Vec<(&'a str, ClusteringOrder)>,
}

impl<'a> PrimaryKey<'a> {
    /// `None` when the table has no clustering columns.
    pub fn clustering_order(&self) -> Option<ClusteringOrderBy<'_>> {
        (!self.clustering.is_empty()).then_some(ClusteringOrderBy(&self.clustering))
    }
}

impl fmt::Display for PrimaryKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PRIMARY KEY ({}", self.partition)?;
        for (name, _) in &self.clustering {
            write!(f, ", {}", Ident(name))?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusteringOrderBy<'a>(&'a [(&'a str, ClusteringOrder)]);

impl fmt::Display for ClusteringOrderBy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CLUSTERING ORDER BY (")?;
        for (i, (name, order)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", Ident(name), order.keyword().unwrap_or("ASC"))?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, kind: ColumnKind, position: i32) -> Column {
        Column::new("ks", "t", name, "int", kind, position)
    }

    fn names<'a>(layout: &TableLayout<'a>) -> Vec<&'a str> {
        layout.columns().iter().map(ProjectedColumn::name).collect()
    }

    #[test]
    fn single_partition_key_without_clustering() {
        let columns = vec![
            column("value", ColumnKind::Regular, -1),
            column("p", ColumnKind::PartitionKey, 0),
        ];
        let layout = TableLayout::project(&columns).unwrap();
        let pk = layout.primary_key();

        assert_eq!(pk.to_string(), "PRIMARY KEY (p)");
        assert_eq!(pk.partition.count(), 1);
        assert!(pk.clustering_order().is_none());
        assert_eq!(names(&layout), ["p", "value"]);
    }

    #[test]
    fn compound_partition_key_with_clustering() {
        let columns = vec![
            column("c2", ColumnKind::Clustering, 1).ordered(ClusteringOrder::Desc),
            column("v", ColumnKind::Regular, -1),
            column("p2", ColumnKind::PartitionKey, 1),
            column("c1", ColumnKind::Clustering, 0).ordered(ClusteringOrder::Asc),
            column("p1", ColumnKind::PartitionKey, 0),
        ];
        let layout = TableLayout::project(&columns).unwrap();
        let pk = layout.primary_key();

        assert_eq!(pk.to_string(), "PRIMARY KEY ((p1,p2), c1, c2)");
        assert_eq!(pk.partition.count(), 2);
        assert_eq!(
            pk.clustering_order().unwrap().to_string(),
            "CLUSTERING ORDER BY (c1 ASC, c2 DESC)"
        );
        assert_eq!(names(&layout), ["p1", "p2", "c1", "c2", "v"]);
    }

    #[test]
    fn positions_are_compared_within_kind_only() {
        // Every kind starts counting at zero; a clustering column at
        // position 0 must still follow a partition key at position 3.
        let columns = vec![
            column("c", ColumnKind::Clustering, 0).ordered(ClusteringOrder::Asc),
            column("p3", ColumnKind::PartitionKey, 3),
            column("p0", ColumnKind::PartitionKey, 0),
            column("p1", ColumnKind::PartitionKey, 1),
            column("p2", ColumnKind::PartitionKey, 2),
        ];
        let layout = TableLayout::project(&columns).unwrap();

        assert_eq!(names(&layout), ["p0", "p1", "p2", "p3", "c"]);
        assert_eq!(
            layout.primary_key().to_string(),
            "PRIMARY KEY ((p0,p1,p2,p3), c)"
        );
    }

    #[test]
    fn regular_columns_are_unbounded() {
        let mut columns = (0..250_000)
            .map(|i| column(&format!("r{i:06}"), ColumnKind::Regular, i))
            .collect::<Vec<_>>();
        columns.push(column("c", ColumnKind::Clustering, 0).ordered(ClusteringOrder::Asc));
        columns.push(column("p", ColumnKind::PartitionKey, 0));

        let layout = TableLayout::project(&columns).unwrap();
        let names = names(&layout);

        assert_eq!(&names[..3], ["p", "c", "r000000"]);
        assert_eq!(names.last(), Some(&"r249999"));
        assert_eq!(layout.primary_key().to_string(), "PRIMARY KEY (p, c)");
    }

    #[test]
    fn static_and_regular_columns_follow_keys_by_name() {
        let columns = vec![
            column("zeta", ColumnKind::Regular, -1),
            column("alpha", ColumnKind::Static, -1),
            column("mid", ColumnKind::Regular, -1),
            column("id", ColumnKind::PartitionKey, 0),
        ];
        let layout = TableLayout::project(&columns).unwrap();

        assert_eq!(names(&layout), ["id", "alpha", "mid", "zeta"]);
    }

    #[test]
    fn unknown_kind_fails() {
        let mut bad = column("v", ColumnKind::Regular, -1);
        bad.kind = "compact_value".to_owned();
        let columns = vec![column("p", ColumnKind::PartitionKey, 0), bad];

        assert_eq!(
            TableLayout::project(&columns),
            Err(LayoutError::UnknownKind {
                column: "v".to_owned(),
                kind: "compact_value".to_owned()
            })
        );
    }

    #[test]
    fn clustering_column_needs_a_direction() {
        let columns = vec![
            column("p", ColumnKind::PartitionKey, 0),
            column("c", ColumnKind::Clustering, 0),
        ];

        assert_eq!(
            TableLayout::project(&columns),
            Err(LayoutError::UnknownClusteringOrder {
                column: "c".to_owned(),
                order: "none".to_owned()
            })
        );
    }

    #[test]
    fn missing_partition_key_fails() {
        let columns = vec![column("c", ColumnKind::Regular, -1)];

        assert_eq!(
            TableLayout::project(&columns),
            Err(LayoutError::MissingPartitionKey)
        );
        assert_eq!(
            TableLayout::project(&[]),
            Err(LayoutError::MissingPartitionKey)
        );
    }

    #[test]
    fn case_sensitive_names_are_quoted_in_keys() {
        let columns = vec![
            column("TenantId", ColumnKind::PartitionKey, 0),
            column("CreatedAt", ColumnKind::Clustering, 0).ordered(ClusteringOrder::Desc),
        ];
        let layout = TableLayout::project(&columns).unwrap();
        let pk = layout.primary_key();

        assert_eq!(pk.to_string(), r#"PRIMARY KEY ("TenantId", "CreatedAt")"#);
        assert_eq!(
            pk.clustering_order().unwrap().to_string(),
            r#"CLUSTERING ORDER BY ("CreatedAt" DESC)"#
        );
    }
}
