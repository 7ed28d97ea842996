//! [`Catalog`] over a live cluster, read through `system_schema`.
//!
//! The dump engine is synchronous; every catalog call blocks the calling
//! thread on the tokio runtime that drives the session.

use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
};

use cqldump::{
    cql::literal::Ident,
    schema::{Column, Keyspace, Table, TableOptions, UserType},
    Catalog, RowStream,
};
use futures_util::StreamExt;
use scylla::{
    frame::{
        response::result::{ColumnSpec, CqlValue, Row},
        value::ValueList,
    },
    query::Query,
    transport::iterator::RowIterator,
    QueryResult, Session, SessionBuilder,
};
use stable_eyre::eyre::{self, eyre, Result, WrapErr};
use tokio::runtime::Handle;
use tracing::instrument;

const KEYSPACES: &str =
    "SELECT keyspace_name, durable_writes, replication FROM system_schema.keyspaces";
const TYPES: &str = "SELECT type_name, field_names, field_types FROM system_schema.types \
                     WHERE keyspace_name = ?";
const TABLES: &str = "SELECT * FROM system_schema.tables WHERE keyspace_name = ?";
const COLUMNS: &str = "SELECT column_name, kind, position, clustering_order, type \
                       FROM system_schema.columns WHERE keyspace_name = ? AND table_name = ?";

pub struct Connection<'a> {
    pub nodes: &'a [String],
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
}

pub struct ScyllaCatalog {
    runtime: Handle,
    session: Session,
    page_size: i32,
}

impl ScyllaCatalog {
    #[instrument(skip_all, fields(nodes = ?connection.nodes))]
    pub fn connect(runtime: Handle, connection: Connection<'_>, page_size: i32) -> Result<Self> {
        let mut builder = SessionBuilder::new().known_nodes(connection.nodes);
        if let Some(user) = connection.user {
            builder = builder.user(user, connection.password.unwrap_or_default());
        }

        let session = runtime
            .block_on(builder.build())
            .wrap_err("could not connect to cluster")?;
        tracing::info!("Connected");

        Ok(Self {
            runtime,
            session,
            page_size,
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn records(&self, query: &str, values: impl ValueList) -> Result<Vec<Record>> {
        let result = self.block_on(self.session.query(query, values))?;
        Ok(Record::all(result))
    }
}

impl Catalog for ScyllaCatalog {
    fn keyspaces(&self) -> Result<Vec<Keyspace>> {
        self.records(KEYSPACES, ())?
            .iter()
            .map(|record| {
                Ok(Keyspace {
                    name: record.text("keyspace_name")?,
                    durable_writes: record.boolean("durable_writes")?.unwrap_or(true),
                    replication: record.text_map("replication")?,
                })
            })
            .collect()
    }

    fn types(&self, keyspace: &str) -> Result<Vec<UserType>> {
        self.records(TYPES, (keyspace,))?
            .iter()
            .map(|record| {
                let names = record.text_list("field_names")?;
                let types = record.text_list("field_types")?;
                if names.len() != types.len() {
                    return Err(eyre!(
                        "type `{keyspace}.{}` lists {} field names but {} field types",
                        record.text("type_name")?,
                        names.len(),
                        types.len()
                    ));
                }

                Ok(UserType::new(
                    keyspace,
                    record.text("type_name")?,
                    names.into_iter().zip(types),
                ))
            })
            .collect()
    }

    fn tables(&self, keyspace: &str) -> Result<Vec<Table>> {
        self.records(TABLES, (keyspace,))?
            .iter()
            .map(|record| record.table(keyspace))
            .collect()
    }

    fn columns(&self, keyspace: &str, table: &str) -> Result<Vec<Column>> {
        self.records(COLUMNS, (keyspace, table))?
            .iter()
            .map(|record| {
                Ok(Column {
                    keyspace: keyspace.to_owned(),
                    table: table.to_owned(),
                    name: record.text("column_name")?,
                    kind: record.text("kind")?,
                    position: record.int("position")?.unwrap_or(-1),
                    clustering_order: record
                        .opt_text("clustering_order")?
                        .unwrap_or_else(|| "none".to_owned()),
                    ty: record.text("type")?,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    fn rows(&self, keyspace: &str, table: &str) -> Result<RowStream<'_>> {
        let query = Query::new(format!(
            "SELECT JSON * FROM {}.{}",
            Ident(keyspace),
            Ident(table)
        ))
        .with_page_size(self.page_size);

        let rows = self.block_on(self.session.query_iter(query, ()))?;
        Ok(Box::new(JsonRows {
            runtime: &self.runtime,
            rows,
            finished: false,
        }))
    }
}

/// Pages through a `SELECT JSON` cursor, yielding the single text column of
/// every row. Ends for good after the first error.
struct JsonRows<'a> {
    runtime: &'a Handle,
    rows: RowIterator,
    finished: bool,
}

impl Iterator for JsonRows<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let next = self.runtime.block_on(self.rows.next());
        let item = match next? {
            Ok(row) => match row.columns.into_iter().next().flatten() {
                Some(CqlValue::Text(json) | CqlValue::Ascii(json)) => Ok(json),
                other => Err(eyre!("expected a JSON text column, got {other:?}")),
            },
            Err(err) => Err(eyre::Report::new(err)),
        };

        self.finished = item.is_err();
        Some(item)
    }
}

/// One catalog row with its values addressed by column name.
///
/// Columns the server does not have decode as absent, which keeps the
/// decoder working across server versions.
struct Record {
    values: BTreeMap<String, CqlValue>,
}

impl Record {
    fn all(result: QueryResult) -> Vec<Self> {
        let specs = result.col_specs;
        result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| Self::new(&specs, row))
            .collect()
    }

    fn new(specs: &[ColumnSpec], row: Row) -> Self {
        let values = specs
            .iter()
            .zip(row.columns)
            .filter_map(|(spec, value)| Some((spec.name.clone(), value?)))
            .collect();

        Self { values }
    }

    fn get(&self, name: &str) -> Option<&CqlValue> {
        self.values.get(name)
    }

    fn opt_text(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(CqlValue::Text(it) | CqlValue::Ascii(it)) => Ok(Some(it.clone())),
            Some(other) => Err(unexpected(name, "text", other)),
        }
    }

    fn text(&self, name: &str) -> Result<String> {
        self.opt_text(name)?
            .ok_or_else(|| eyre!("catalog column `{name}` is missing"))
    }

    fn boolean(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(CqlValue::Boolean(it)) => Ok(Some(*it)),
            Some(other) => Err(unexpected(name, "boolean", other)),
        }
    }

    fn int(&self, name: &str) -> Result<Option<i32>> {
        match self.get(name) {
            None => Ok(None),
            Some(CqlValue::Int(it)) => Ok(Some(*it)),
            Some(other) => Err(unexpected(name, "int", other)),
        }
    }

    fn double(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(CqlValue::Double(it)) => Ok(Some(*it)),
            Some(CqlValue::Float(it)) => Ok(Some(f64::from(*it))),
            Some(other) => Err(unexpected(name, "double", other)),
        }
    }

    fn text_list(&self, name: &str) -> Result<Vec<String>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(CqlValue::List(items) | CqlValue::Set(items)) => items
                .iter()
                .map(|item| match item {
                    CqlValue::Text(it) | CqlValue::Ascii(it) => Ok(it.clone()),
                    other => Err(unexpected(name, "text", other)),
                })
                .collect(),
            Some(other) => Err(unexpected(name, "list<text>", other)),
        }
    }

    fn text_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        self.map(name, |value| match value {
            CqlValue::Text(it) | CqlValue::Ascii(it) => Ok(it.clone()),
            other => Err(unexpected(name, "text", other)),
        })
    }

    fn map<V>(
        &self,
        name: &str,
        value: impl Fn(&CqlValue) -> Result<V>,
    ) -> Result<BTreeMap<String, V>> {
        match self.get(name) {
            None => Ok(BTreeMap::new()),
            Some(CqlValue::Map(entries)) => entries
                .iter()
                .map(|(k, v)| match k {
                    CqlValue::Text(k) | CqlValue::Ascii(k) => Ok((k.clone(), value(v)?)),
                    other => Err(unexpected(name, "text", other)),
                })
                .collect(),
            Some(other) => Err(unexpected(name, "map", other)),
        }
    }

    fn table(&self, keyspace: &str) -> Result<Table> {
        let defaults = TableOptions::default();
        let options = TableOptions {
            bloom_filter_fp_chance: self
                .double("bloom_filter_fp_chance")?
                .unwrap_or(defaults.bloom_filter_fp_chance),
            caching: self.text_map("caching")?,
            comment: self.opt_text("comment")?.unwrap_or_default(),
            compaction: self.text_map("compaction")?,
            compression: self.text_map("compression")?,
            crc_check_chance: self
                .double("crc_check_chance")?
                .unwrap_or(defaults.crc_check_chance),
            dclocal_read_repair_chance: self.double("dclocal_read_repair_chance")?,
            default_time_to_live: self.int("default_time_to_live")?.unwrap_or_default(),
            extensions: self.map("extensions", |value| match value {
                CqlValue::Blob(it) => Ok(it.clone()),
                other => Err(unexpected("extensions", "blob", other)),
            })?,
            flags: self.text_list("flags")?.into_iter().collect::<BTreeSet<_>>(),
            gc_grace_seconds: self
                .int("gc_grace_seconds")?
                .unwrap_or(defaults.gc_grace_seconds),
            max_index_interval: self
                .int("max_index_interval")?
                .unwrap_or(defaults.max_index_interval),
            memtable_flush_period_in_ms: self
                .int("memtable_flush_period_in_ms")?
                .unwrap_or_default(),
            min_index_interval: self
                .int("min_index_interval")?
                .unwrap_or(defaults.min_index_interval),
            read_repair_chance: self.double("read_repair_chance")?,
            speculative_retry: self
                .opt_text("speculative_retry")?
                .unwrap_or(defaults.speculative_retry),
        };

        let id = match self.get("id") {
            Some(CqlValue::Uuid(id)) => Some(*id),
            _ => None,
        };

        Ok(Table {
            keyspace: keyspace.to_owned(),
            name: self.text("table_name")?,
            id,
            options,
        })
    }
}

fn unexpected(column: &str, expected: &str, value: &CqlValue) -> eyre::Report {
    eyre!("catalog column `{column}` should hold {expected}, got {value:?}")
}
