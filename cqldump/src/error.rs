use std::io;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A table's columns do not describe a valid primary key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("column `{column}` has unknown kind `{kind}`")]
    UnknownKind { column: String, kind: String },
    #[error("clustering column `{column}` has unknown order `{order}`")]
    UnknownClusteringOrder { column: String, order: String },
    #[error("table has no partition key column")]
    MissingPartitionKey,
}

/// A property value has no CQL literal form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("`{property}` is not a finite number: {value}")]
    NotFinite { property: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("could not list keyspaces")]
    ListKeyspaces {
        #[source]
        source: BoxError,
    },
    #[error("could not read metadata of keyspace `{keyspace}`")]
    Metadata {
        keyspace: String,
        #[source]
        source: BoxError,
    },
    #[error("invalid columns in table `{keyspace}.{table}`")]
    Layout {
        keyspace: String,
        table: String,
        #[source]
        source: LayoutError,
    },
    #[error("could not render table `{keyspace}.{table}`")]
    Render {
        keyspace: String,
        table: String,
        #[source]
        source: RenderError,
    },
    #[error("could not read rows of `{keyspace}.{table}`")]
    Data {
        keyspace: String,
        table: String,
        /// Rows written to the output before the fault.
        rows: u64,
        #[source]
        source: BoxError,
    },
    #[error("could not write statements")]
    Io(#[from] io::Error),
}

impl DumpError {
    pub(crate) fn metadata(keyspace: &str, source: eyre::Report) -> Self {
        DumpError::Metadata {
            keyspace: keyspace.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn data(keyspace: &str, table: &str, rows: u64, source: eyre::Report) -> Self {
        DumpError::Data {
            keyspace: keyspace.to_owned(),
            table: table.to_owned(),
            rows,
            source: source.into(),
        }
    }

    /// Faults that end the dump of the current keyspace.
    pub fn is_keyspace_fatal(&self) -> bool {
        matches!(
            self,
            DumpError::Metadata { .. } | DumpError::Layout { .. } | DumpError::Render { .. }
        )
    }

    /// The error followed by its whole source chain, on one line.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
