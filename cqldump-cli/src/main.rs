use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use cqldump::{Catalog, DumpFilter, DumpOptions, DumpReport, Dumper, MemoryCatalog};
use stable_eyre::{eyre::WrapErr, Result};

use crate::cluster::{Connection, ScyllaCatalog};

mod cluster;
mod logging;

/// Dumps keyspaces of a Cassandra or Scylla cluster as CQL statements that
/// recreate their types, tables and rows.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Contact points of the cluster
    #[arg(long, default_value = "127.0.0.1", value_delimiter = ',')]
    host: Vec<String>,

    /// Native protocol port of the contact points
    #[arg(short, long, default_value_t = 9042)]
    port: u16,

    #[arg(short, long)]
    user: Option<String>,

    #[arg(long, requires = "user")]
    password: Option<String>,

    /// Keyspaces to dump; all of them when omitted
    #[arg(short, long, value_delimiter = ',')]
    include: Vec<String>,

    /// Keyspaces to skip, or `keyspace.table` to skip only that table's rows
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Also dump the keyspaces the server manages itself
    #[arg(long)]
    include_system: bool,

    /// Dump a catalog snapshot in RON instead of a live cluster
    #[arg(long, conflicts_with_all = ["host", "user"])]
    catalog: Vec<PathBuf>,

    /// Write statements to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, conflicts_with = "data_only")]
    schema_only: bool,

    #[arg(long)]
    data_only: bool,

    /// Start every keyspace with `CREATE KEYSPACE IF NOT EXISTS` and `USE`
    #[arg(long)]
    create_keyspace: bool,

    /// Leave section comments out; fault diagnostics are kept
    #[arg(long)]
    no_comments: bool,

    /// Rows fetched per page while dumping data
    #[arg(long, default_value_t = 5000)]
    page_size: i32,

    /// Log filter directives, overriding `RUST_LOG`
    #[arg(long)]
    log: Option<String>,

    /// OTLP collector to export traces to
    #[arg(long)]
    otlp_endpoint: Option<String>,
}

impl Args {
    fn filter(&self) -> DumpFilter {
        let filter = DumpFilter::new(self.include.iter().cloned(), self.exclude.iter().cloned());
        if self.include_system {
            filter
        } else {
            filter.exclude_system()
        }
    }

    fn options(&self) -> DumpOptions {
        DumpOptions {
            schema: !self.data_only,
            data: !self.schema_only,
            create_keyspace: self.create_keyspace,
            comments: !self.no_comments,
        }
    }

    fn output(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).wrap_err_with(|| format!("could not create {path:?}"))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }
}

fn main() -> Result<ExitCode> {
    stable_eyre::install()?;
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    {
        let _guard = runtime.enter();
        logging::setup_telemetry(
            "cqldump",
            args.log.as_deref(),
            args.otlp_endpoint.clone(),
        )?;
    }

    let report = if args.catalog.is_empty() {
        let nodes = args
            .host
            .iter()
            .map(|host| format!("{host}:{}", args.port))
            .collect::<Vec<_>>();
        let connection = Connection {
            nodes: &nodes,
            user: args.user.as_deref(),
            password: args.password.as_deref(),
        };
        let catalog =
            ScyllaCatalog::connect(runtime.handle().clone(), connection, args.page_size)?;
        dump(catalog, &args)?
    } else {
        let snapshots = args
            .catalog
            .iter()
            .map(|path| std::fs::read(path).wrap_err_with(|| format!("could not read {path:?}")))
            .collect::<Result<Vec<_>>>()?;
        let catalog = MemoryCatalog::load(snapshots.iter().map(Vec::as_slice))?;
        dump(catalog, &args)?
    };

    logging::shutdown_telemetry();

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn dump(catalog: impl Catalog, args: &Args) -> Result<DumpReport> {
    let mut dumper = Dumper::new(catalog, args.output()?)
        .with_filter(args.filter())
        .with_options(args.options());

    let report = dumper.dump()?;
    for failure in &report.failures {
        tracing::error!(error = %failure.chain(), "Incomplete dump");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn system_keyspaces_are_skipped_by_default() {
        let args = Args::parse_from(["cqldump", "-i", "shop,system_auth"]);

        assert!(args.filter().includes_keyspace("shop"));
        assert!(!args.filter().includes_keyspace("system_auth"));

        let args = Args::parse_from(["cqldump", "--include-system"]);
        assert!(args.filter().includes_keyspace("system_auth"));
    }

    #[test]
    fn table_exclusions_only_touch_rows() {
        let args = Args::parse_from(["cqldump", "-x", "shop.audit", "--exclude", "logs"]);
        let filter = args.filter();

        assert!(filter.includes_keyspace("shop"));
        assert!(!filter.includes_table_data("shop", "audit"));
        assert!(!filter.includes_keyspace("logs"));
    }

    #[test]
    fn flags_map_to_options() {
        let args = Args::parse_from(["cqldump", "--schema-only", "--no-comments"]);

        assert_eq!(
            args.options(),
            DumpOptions {
                data: false,
                comments: false,
                ..DumpOptions::default()
            }
        );
        assert!(Args::try_parse_from(["cqldump", "--schema-only", "--data-only"]).is_err());
    }

    #[test]
    fn offline_catalog_conflicts_with_connection() {
        assert!(Args::try_parse_from(["cqldump", "--catalog", "a.ron", "--host", "db"]).is_err());
        assert!(
            Args::try_parse_from(["cqldump", "--catalog", "a.ron", "--catalog", "b.ron"]).is_ok()
        );
    }
}
