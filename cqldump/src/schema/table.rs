use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub keyspace: String,
    pub name: String,
    pub id: Option<Uuid>,
    pub options: TableOptions,
}

impl Table {
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            id: None,
            options: TableOptions::default(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.keyspace, self.name)
    }
}

/// Storage properties of a table, one field per `system_schema.tables` column.
///
/// The read repair chances are optional: servers from 4.0 on dropped them
/// from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub bloom_filter_fp_chance: f64,
    pub caching: BTreeMap<String, String>,
    pub comment: String,
    pub compaction: BTreeMap<String, String>,
    pub compression: BTreeMap<String, String>,
    pub crc_check_chance: f64,
    pub dclocal_read_repair_chance: Option<f64>,
    pub default_time_to_live: i32,
    #[serde(with = "extensions")]
    pub extensions: BTreeMap<String, Vec<u8>>,
    pub flags: BTreeSet<String>,
    pub gc_grace_seconds: i32,
    pub max_index_interval: i32,
    pub memtable_flush_period_in_ms: i32,
    pub min_index_interval: i32,
    pub read_repair_chance: Option<f64>,
    pub speculative_retry: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            bloom_filter_fp_chance: 0.01,
            caching: [("keys", "ALL"), ("rows_per_partition", "NONE")]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            comment: String::new(),
            compaction: [
                (
                    "class",
                    "org.apache.cassandra.db.compaction.SizeTieredCompactionStrategy",
                ),
                ("max_threshold", "32"),
                ("min_threshold", "4"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
            compression: [
                ("chunk_length_in_kb", "64"),
                ("class", "org.apache.cassandra.io.compress.LZ4Compressor"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect(),
            crc_check_chance: 1.0,
            dclocal_read_repair_chance: Some(0.1),
            default_time_to_live: 0,
            extensions: BTreeMap::new(),
            flags: BTreeSet::new(),
            gc_grace_seconds: 864000,
            max_index_interval: 2048,
            memtable_flush_period_in_ms: 0,
            min_index_interval: 128,
            read_repair_chance: Some(0.0),
            speculative_retry: "99PERCENTILE".to_owned(),
        }
    }
}

mod extensions {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_bytes::ByteBuf;

    pub fn serialize<S: Serializer>(
        value: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .iter()
            .map(|(k, v)| (k, serde_bytes::Bytes::new(v)))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        let raw = BTreeMap::<String, ByteBuf>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|(k, v)| (k, v.into_vec())).collect())
    }
}
