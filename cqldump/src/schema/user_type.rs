use serde::{Deserialize, Serialize};

/// A user-defined type as stored in `system_schema.types`.
///
/// Field order defines the serialized layout of the type, so `fields` keeps
/// exactly the order the catalog returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserType {
    pub keyspace: String,
    pub name: String,
    pub fields: Vec<(String, String)>,
}

impl UserType {
    pub fn new<N, T>(
        keyspace: impl Into<String>,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, T)>,
    ) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, t)| (n.into(), t.into()))
                .collect(),
        }
    }
}
