use std::fmt;

use crate::{
    cql::{
        layout::TableLayout,
        literal::{self, Ident, MapLiteral, Quoted},
    },
    error::RenderError,
    schema::{ColumnKind, Keyspace, Table, UserType},
};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy)]
pub struct CreateKeyspace<'a>(pub &'a Keyspace);

impl fmt::Display for CreateKeyspace<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Keyspace {
            name,
            durable_writes,
            replication,
        } = self.0;

        writeln!(
            f,
            "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {} AND durable_writes = {};",
            Ident(name),
            MapLiteral(replication),
            durable_writes
        )?;
        writeln!(f, "USE {};", Ident(name))
    }
}

/// `CREATE TYPE`, fields in catalog order.
#[derive(Debug, Clone, Copy)]
pub struct CreateType<'a>(pub &'a UserType);

impl fmt::Display for CreateType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CREATE TYPE {} (", Ident(&self.0.name))?;
        let last = self.0.fields.len().saturating_sub(1);
        for (i, (name, ty)) in self.0.fields.iter().enumerate() {
            let separator = if i < last { "," } else { "" };
            writeln!(f, "{INDENT}{} {ty}{separator}", Ident(name))?;
        }
        writeln!(f, ");")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CreateTable<'a> {
    pub table: &'a Table,
    pub layout: &'a TableLayout<'a>,
}

impl<'a> CreateTable<'a> {
    pub fn new(table: &'a Table, layout: &'a TableLayout<'a>) -> Self {
        Self { table, layout }
    }

    /// The `WITH` clause entries, in their fixed order.
    pub fn properties(&self) -> Result<Vec<String>, RenderError> {
        let options = &self.table.options;
        let primary_key = self.layout.primary_key();
        let mut properties = Vec::with_capacity(15);

        if let Some(order) = primary_key.clustering_order() {
            properties.push(order.to_string());
        }

        let mut chance = |name: &'static str, value: f64| -> Result<(), RenderError> {
            properties.push(format!("{name} = {}", literal::chance(name, value)?));
            Ok(())
        };
        chance("bloom_filter_fp_chance", options.bloom_filter_fp_chance)?;
        chance("crc_check_chance", options.crc_check_chance)?;
        if let Some(value) = options.dclocal_read_repair_chance {
            chance("dclocal_read_repair_chance", value)?;
        }

        properties.push(format!(
            "default_time_to_live = {}",
            options.default_time_to_live
        ));
        properties.push(format!("gc_grace_seconds = {}", options.gc_grace_seconds));
        properties.push(format!("max_index_interval = {}", options.max_index_interval));
        properties.push(format!(
            "memtable_flush_period_in_ms = {}",
            options.memtable_flush_period_in_ms
        ));
        properties.push(format!("min_index_interval = {}", options.min_index_interval));

        if let Some(value) = options.read_repair_chance {
            properties.push(format!(
                "read_repair_chance = {}",
                literal::chance("read_repair_chance", value)?
            ));
        }

        properties.push(format!(
            "speculative_retry = {}",
            Quoted(&options.speculative_retry)
        ));
        properties.push(format!("caching = {}", MapLiteral(&options.caching)));
        properties.push(format!("comment = {}", Quoted(&options.comment)));
        properties.push(format!("compression = {}", MapLiteral(&options.compression)));
        properties.push(format!("compaction = {}", MapLiteral(&options.compaction)));

        Ok(properties)
    }

    /// The complete statement, or nothing if any property cannot be rendered.
    pub fn render(&self) -> Result<String, RenderError> {
        let properties = self.properties()?;

        Ok(TableStatement {
            create: self,
            properties: &properties,
        }
        .to_string())
    }
}

/// A `CREATE TABLE` whose properties are already rendered.
struct TableStatement<'a> {
    create: &'a CreateTable<'a>,
    properties: &'a [String],
}

impl fmt::Display for TableStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CreateTable { table, layout } = self.create;

        writeln!(f, "CREATE TABLE {} (", Ident(&table.name))?;
        for column in layout.columns() {
            let modifier = match column.kind {
                ColumnKind::Static => " static",
                _ => "",
            };
            writeln!(
                f,
                "{INDENT}{} {}{modifier},",
                Ident(column.name()),
                column.ty()
            )?;
        }
        writeln!(f, "{INDENT}{}", layout.primary_key())?;
        f.write_str(")")?;

        for (i, property) in self.properties.iter().enumerate() {
            if i == 0 {
                write!(f, " WITH {property}")?;
            } else {
                write!(f, "\n{INDENT}AND {property}")?;
            }
        }
        f.write_str(";\n")
    }
}

/// One row as `INSERT INTO <table> JSON '<payload>';`.
///
/// The payload is opaque text; only its single quotes are touched.
#[derive(Debug, Clone, Copy)]
pub struct InsertJson<'a> {
    pub table: &'a str,
    pub payload: &'a str,
}

impl fmt::Display for InsertJson<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "INSERT INTO {} JSON {};",
            Ident(self.table),
            Quoted(self.payload)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ClusteringOrder, Column, TableOptions};

    fn readings() -> (Table, Vec<Column>) {
        let table = Table {
            keyspace: "metrics".to_owned(),
            name: "readings".to_owned(),
            id: None,
            options: TableOptions {
                bloom_filter_fp_chance: 0.001,
                caching: [("keys", "NONE"), ("rows_per_partition", "10")]
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
                comment: "sensor readings".to_owned(),
                compaction: [
                    (
                        "class",
                        "org.apache.cassandra.db.compaction.TimeWindowCompactionStrategy",
                    ),
                    ("compaction_window_size", "1"),
                    ("compaction_window_unit", "DAYS"),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
                compression: [
                    ("chunk_length_in_kb", "16"),
                    ("class", "org.apache.cassandra.io.compress.ZstdCompressor"),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
                crc_check_chance: 0.5,
                dclocal_read_repair_chance: Some(0.0),
                default_time_to_live: 2592000,
                gc_grace_seconds: 3600,
                max_index_interval: 4096,
                memtable_flush_period_in_ms: 60000,
                min_index_interval: 64,
                read_repair_chance: Some(0.25),
                speculative_retry: "95PERCENTILE".to_owned(),
                ..TableOptions::default()
            },
        };
        let columns = vec![
            Column::new("metrics", "readings", "val", "double", ColumnKind::Regular, -1),
            Column::new("metrics", "readings", "ts", "timestamp", ColumnKind::Clustering, 0)
                .ordered(ClusteringOrder::Desc),
            Column::new("metrics", "readings", "id", "uuid", ColumnKind::PartitionKey, 0),
        ];
        (table, columns)
    }

    #[test]
    fn table_statement_in_fixed_order() {
        let (table, columns) = readings();
        let layout = TableLayout::project(&columns).unwrap();
        let statement = CreateTable::new(&table, &layout).render().unwrap();

        assert_eq!(
            statement,
            "\
CREATE TABLE readings (
    id uuid,
    ts timestamp,
    val double,
    PRIMARY KEY (id, ts)
) WITH CLUSTERING ORDER BY (ts DESC)
    AND bloom_filter_fp_chance = 0.001
    AND crc_check_chance = 0.5
    AND dclocal_read_repair_chance = 0.0
    AND default_time_to_live = 2592000
    AND gc_grace_seconds = 3600
    AND max_index_interval = 4096
    AND memtable_flush_period_in_ms = 60000
    AND min_index_interval = 64
    AND read_repair_chance = 0.25
    AND speculative_retry = '95PERCENTILE'
    AND caching = {'keys': 'NONE', 'rows_per_partition': '10'}
    AND comment = 'sensor readings'
    AND compression = {'chunk_length_in_kb': '16', 'class': 'org.apache.cassandra.io.compress.ZstdCompressor'}
    AND compaction = {'class': 'org.apache.cassandra.db.compaction.TimeWindowCompactionStrategy', 'compaction_window_size': '1', 'compaction_window_unit': 'DAYS'};
"
        );
    }

    #[test]
    fn first_property_is_unprefixed_without_clustering() {
        let (mut table, columns) = readings();
        table.options.dclocal_read_repair_chance = None;
        table.options.read_repair_chance = None;
        let columns = columns
            .into_iter()
            .filter(|it| it.name != "ts")
            .collect::<Vec<_>>();
        let layout = TableLayout::project(&columns).unwrap();
        let create = CreateTable::new(&table, &layout);

        let properties = create.properties().unwrap();
        assert_eq!(properties[0], "bloom_filter_fp_chance = 0.001");
        assert_eq!(properties.len(), 12);
        assert!(!properties.iter().any(|it| it.contains("read_repair")));

        let statement = create.render().unwrap();
        assert!(statement.contains("PRIMARY KEY (id)\n) WITH bloom_filter_fp_chance = 0.001\n"));
        assert!(!statement.contains("CLUSTERING ORDER BY"));
        assert_eq!(statement.matches("\n    AND ").count(), 11);
    }

    #[test]
    fn rendering_is_deterministic() {
        let (table, columns) = readings();
        let layout = TableLayout::project(&columns).unwrap();

        let first = CreateTable::new(&table, &layout).render().unwrap();
        let second = CreateTable::new(&table, &layout).render().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unrenderable_property_yields_no_statement() {
        let (mut table, columns) = readings();
        table.options.crc_check_chance = f64::NAN;
        let layout = TableLayout::project(&columns).unwrap();

        assert!(matches!(
            CreateTable::new(&table, &layout).render(),
            Err(RenderError::NotFinite {
                property: "crc_check_chance",
                ..
            })
        ));
    }

    #[test]
    fn static_columns_keep_their_modifier() {
        let (table, mut columns) = readings();
        columns.push(Column::new(
            "metrics",
            "readings",
            "unit",
            "text",
            ColumnKind::Static,
            -1,
        ));
        let layout = TableLayout::project(&columns).unwrap();
        let statement = CreateTable::new(&table, &layout).render().unwrap();

        assert!(statement.contains("    ts timestamp,\n    unit text static,\n    val double,\n"));
    }

    #[test]
    fn keyword_names_are_quoted_everywhere() {
        let (mut table, _) = readings();
        table.name = "select".to_owned();
        let columns = vec![
            Column::new("metrics", "select", "limit", "text", ColumnKind::Regular, -1),
            Column::new("metrics", "select", "order", "int", ColumnKind::Clustering, 0)
                .ordered(ClusteringOrder::Desc),
            Column::new("metrics", "select", "from", "int", ColumnKind::PartitionKey, 0),
        ];
        let layout = TableLayout::project(&columns).unwrap();
        let statement = CreateTable::new(&table, &layout).render().unwrap();

        assert!(statement.starts_with(
            "CREATE TABLE \"select\" (\n    \"from\" int,\n    \"order\" int,\n    \"limit\" text,\n    \
             PRIMARY KEY (\"from\", \"order\")\n\
             ) WITH CLUSTERING ORDER BY (\"order\" DESC)\n"
        ));

        let insert = InsertJson {
            table: "select",
            payload: "{}",
        };
        assert_eq!(insert.to_string(), "INSERT INTO \"select\" JSON '{}';\n");
    }

    #[test]
    fn comment_with_quote_is_escaped() {
        let (mut table, columns) = readings();
        table.options.comment = "owner's table".to_owned();
        let layout = TableLayout::project(&columns).unwrap();
        let statement = CreateTable::new(&table, &layout).render().unwrap();

        assert!(statement.contains("AND comment = 'owner''s table'\n"));
    }

    #[test]
    fn type_fields_keep_catalog_order() {
        let ty = UserType::new(
            "shop",
            "address",
            [("zip", "text"), ("street", "text"), ("tags", "frozen<set<text>>")],
        );

        assert_eq!(
            CreateType(&ty).to_string(),
            "\
CREATE TYPE address (
    zip text,
    street text,
    tags frozen<set<text>>
);
"
        );
    }

    #[test]
    fn insert_doubles_single_quotes() {
        let insert = InsertJson {
            table: "users",
            payload: r#"{"id": 1, "name": "O'Brien"}"#,
        };

        assert_eq!(
            insert.to_string(),
            "INSERT INTO users JSON '{\"id\": 1, \"name\": \"O''Brien\"}';\n"
        );
    }

    #[test]
    fn keyspace_header_renders_replication() {
        let keyspace = Keyspace::new("shop").with_replication([
            ("class", "org.apache.cassandra.locator.NetworkTopologyStrategy"),
            ("dc1", "3"),
        ]);

        assert_eq!(
            CreateKeyspace(&keyspace).to_string(),
            "CREATE KEYSPACE IF NOT EXISTS shop WITH replication = \
             {'class': 'org.apache.cassandra.locator.NetworkTopologyStrategy', 'dc1': '3'} \
             AND durable_writes = true;\nUSE shop;\n"
        );
    }
}
