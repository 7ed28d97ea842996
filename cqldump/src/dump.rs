//! Statement stream orchestration.
//!
//! Per keyspace the stream holds every `CREATE TYPE`, then every
//! `CREATE TABLE`, then the rows of every table. Schema statements of a
//! keyspace are all fetched and rendered before the first one is written, so
//! a metadata fault never leaves half a keyspace behind.

use std::io::{self, Write};

use tracing::{instrument, Level};

use crate::{
    catalog::Catalog,
    cql::{CreateKeyspace, CreateTable, CreateType, InsertJson, TableLayout},
    error::DumpError,
    filter::DumpFilter,
    schema::{Column, Keyspace, Table, UserType},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Emit `CREATE TYPE` and `CREATE TABLE` statements.
    pub schema: bool,
    /// Emit `INSERT ... JSON` statements.
    pub data: bool,
    /// Start every keyspace with `CREATE KEYSPACE IF NOT EXISTS` and `USE`.
    pub create_keyspace: bool,
    /// Section banners. Fault diagnostics are written regardless.
    pub comments: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            schema: true,
            data: true,
            create_keyspace: false,
            comments: true,
        }
    }
}

impl DumpOptions {
    pub fn schema_only() -> Self {
        Self {
            data: false,
            ..Self::default()
        }
    }

    pub fn data_only() -> Self {
        Self {
            schema: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct DumpReport {
    pub keyspaces: usize,
    pub types: usize,
    pub tables: usize,
    pub rows: u64,
    /// Keyspace and table faults the dump continued past.
    pub failures: Vec<DumpError>,
}

impl DumpReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: DumpReport) {
        self.keyspaces += other.keyspaces;
        self.types += other.types;
        self.tables += other.tables;
        self.rows += other.rows;
        self.failures.extend(other.failures);
    }
}

pub struct Dumper<C, W> {
    catalog: C,
    out: W,
    filter: DumpFilter,
    options: DumpOptions,
}

impl<C: Catalog, W: Write> Dumper<C, W> {
    pub fn new(catalog: C, out: W) -> Self {
        Self {
            catalog,
            out,
            filter: DumpFilter::default(),
            options: DumpOptions::default(),
        }
    }

    pub fn with_filter(mut self, filter: DumpFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_options(mut self, options: DumpOptions) -> Self {
        self.options = options;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Dumps every keyspace the filter selects.
    ///
    /// Only a failure to list keyspaces or to write output is returned as an
    /// error; keyspace and table faults end up in the report.
    #[instrument(level = Level::DEBUG, skip(self), err)]
    pub fn dump(&mut self) -> Result<DumpReport, DumpError> {
        let keyspaces = self
            .catalog
            .keyspaces()
            .map_err(|source| DumpError::ListKeyspaces {
                source: source.into(),
            })?;

        let mut report = DumpReport::default();
        for keyspace in self.filter.select(keyspaces) {
            match self.dump_keyspace(&keyspace) {
                Ok(dumped) => report.merge(dumped),
                Err(err) if err.is_keyspace_fatal() => {
                    self.diagnostic(&err)?;
                    report.failures.push(err);
                }
                Err(err) => return Err(err),
            }
        }
        self.out.flush()?;

        tracing::info!(
            keyspaces = report.keyspaces,
            tables = report.tables,
            rows = report.rows,
            failures = report.failures.len(),
            "Dump finished"
        );
        Ok(report)
    }

    /// Dumps one keyspace, honoring the filter. A keyspace the filter does
    /// not select yields an empty report and no output.
    ///
    /// Metadata faults abort the keyspace before anything is written for it.
    /// Row stream faults are recorded in the report and the next table
    /// proceeds.
    #[instrument(level = Level::DEBUG, skip_all, fields(keyspace = %keyspace.name), err)]
    pub fn dump_keyspace(&mut self, keyspace: &Keyspace) -> Result<DumpReport, DumpError> {
        let name = keyspace.name.as_str();
        if !self.filter.includes_keyspace(name) {
            tracing::debug!("Keyspace not selected");
            return Ok(DumpReport::default());
        }
        tracing::info!("Dumping keyspace");

        let types = if self.options.schema {
            self.catalog
                .types(name)
                .map_err(|err| DumpError::metadata(name, err))?
        } else {
            Vec::new()
        };
        let tables = self
            .catalog
            .tables(name)
            .map_err(|err| DumpError::metadata(name, err))?;

        let mut statements = Vec::with_capacity(tables.len());
        if self.options.schema {
            for table in &tables {
                let columns = self
                    .catalog
                    .columns(name, &table.name)
                    .map_err(|err| DumpError::metadata(name, err))?;
                statements.push(render_table(table, &columns)?);
            }
        }

        let mut report = DumpReport {
            keyspaces: 1,
            ..DumpReport::default()
        };

        if self.options.comments {
            banner(&mut self.out, &format!("keyspace {name}"))?;
        }
        if self.options.create_keyspace {
            write!(self.out, "{}", CreateKeyspace(keyspace))?;
            writeln!(self.out)?;
        }
        for ty in &types {
            write_statement(&mut self.out, &CreateType(ty).to_string())?;
            report.types += 1;
        }
        for statement in &statements {
            write_statement(&mut self.out, statement)?;
            report.tables += 1;
        }

        if self.options.data {
            for table in &tables {
                if !self.filter.includes_table_data(name, &table.name) {
                    tracing::info!(table = %table.name, "Table data excluded");
                    if self.options.comments {
                        comment(
                            &mut self.out,
                            &format!("rows of {} excluded", table.qualified_name()),
                        )?;
                        writeln!(self.out)?;
                    }
                    continue;
                }

                match self.dump_rows(table) {
                    Ok(rows) => report.rows += rows,
                    Err(err @ DumpError::Data { rows, .. }) => {
                        report.rows += rows;
                        self.diagnostic(&err)?;
                        report.failures.push(err);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(report)
    }

    pub fn dump_type(&mut self, ty: &UserType) -> Result<(), DumpError> {
        write_statement(&mut self.out, &CreateType(ty).to_string())?;
        Ok(())
    }

    /// Writes the `CREATE TABLE` of `table` laid out from `columns`.
    pub fn dump_table(&mut self, table: &Table, columns: &[Column]) -> Result<(), DumpError> {
        let statement = render_table(table, columns)?;
        write_statement(&mut self.out, &statement)?;
        Ok(())
    }

    /// Streams every row of `table` as an insert statement and returns how
    /// many were written.
    ///
    /// Rows written before a cursor fault stay in the output; each of them
    /// is a complete statement, and the returned `Data` error counts them.
    #[instrument(level = Level::DEBUG, skip_all, fields(table = %table.qualified_name()), err)]
    pub fn dump_rows(&mut self, table: &Table) -> Result<u64, DumpError> {
        let data_fault =
            |written, err| DumpError::data(&table.keyspace, &table.name, written, err);

        let rows = self
            .catalog
            .rows(&table.keyspace, &table.name)
            .map_err(|err| data_fault(0, err))?;

        if self.options.comments {
            comment(&mut self.out, &format!("rows of {}", table.qualified_name()))?;
        }

        let mut written = 0;
        let mut result = Ok(());
        for row in rows {
            match row {
                Ok(payload) => {
                    let insert = InsertJson {
                        table: &table.name,
                        payload: &payload,
                    };
                    write!(self.out, "{insert}")?;
                    written += 1;
                }
                Err(err) => {
                    result = Err(data_fault(written, err));
                    break;
                }
            }
        }

        if self.options.comments || written > 0 {
            writeln!(self.out)?;
        }
        tracing::debug!(rows = written, "Dumped rows");

        result.map(|_| written)
    }

    /// Reports a fault in the log and as a comment in the statement stream.
    fn diagnostic(&mut self, err: &DumpError) -> Result<(), DumpError> {
        let chain = err.chain();
        tracing::warn!(error = %chain, "Dump fault");
        comment(&mut self.out, &format!("ERROR: {chain}"))?;
        writeln!(self.out)?;
        Ok(())
    }
}

fn render_table(table: &Table, columns: &[Column]) -> Result<String, DumpError> {
    let layout = TableLayout::project(columns).map_err(|source| DumpError::Layout {
        keyspace: table.keyspace.clone(),
        table: table.name.clone(),
        source,
    })?;

    CreateTable::new(table, &layout)
        .render()
        .map_err(|source| DumpError::Render {
            keyspace: table.keyspace.clone(),
            table: table.name.clone(),
            source,
        })
}

fn write_statement(out: &mut impl Write, statement: &str) -> io::Result<()> {
    out.write_all(statement.as_bytes())?;
    writeln!(out)
}

/// Writes `text` as `--` comments, one per line, so replaying the stream
/// ignores it.
fn comment(out: &mut impl Write, text: &str) -> io::Result<()> {
    for line in text.lines() {
        writeln!(out, "-- {line}")?;
    }
    Ok(())
}

fn banner(out: &mut impl Write, title: &str) -> io::Result<()> {
    let line = "-".repeat(title.len() + 6);
    writeln!(out, "{line}")?;
    writeln!(out, "-- {title} --")?;
    writeln!(out, "{line}")
}
