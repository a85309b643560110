use crate::domain::CellValue;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One remote datalogger as described in the client registry
///
/// The network address is not stored here: it is the registry key and the join
/// key used by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Table name on the datalogger
    pub table_name: String,
    /// Target PostgreSQL table
    pub db_table: String,
    pub username: String,
    pub password: String,
    pub site: String,
    pub latitude: CellValue,
    pub longitude: CellValue,
    /// Watermark of the last committed record, written only by checkpointing
    pub last_fetch: NaiveDateTime,
    /// Registry keys this service does not interpret, kept for the rewrite
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// A registry entry as loaded: a usable client, or the raw JSON of an entry
/// that does not describe one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum RegistryEntry {
    Client(ClientConfig),
    Unparsed(serde_json::Value),
}

/// Address → client mapping, in registry file order
///
/// Entries that fail to parse are skipped by every pipeline stage but kept
/// verbatim, in place, so the registry rewrite gives them back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClientRegistry {
    entries: IndexMap<String, RegistryEntry>,
}

impl ClientRegistry {
    pub fn new(clients: IndexMap<String, ClientConfig>) -> Self {
        Self {
            entries: clients
                .into_iter()
                .map(|(address, client)| (address, RegistryEntry::Client(client)))
                .collect(),
        }
    }

    pub fn get(&self, address: &str) -> Option<&ClientConfig> {
        match self.entries.get(address)? {
            RegistryEntry::Client(client) => Some(client),
            RegistryEntry::Unparsed(_) => None,
        }
    }

    pub fn get_mut(&mut self, address: &str) -> Option<&mut ClientConfig> {
        match self.entries.get_mut(address)? {
            RegistryEntry::Client(client) => Some(client),
            RegistryEntry::Unparsed(_) => None,
        }
    }

    /// Usable clients only
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClientConfig)> {
        self.entries.iter().filter_map(|(address, entry)| match entry {
            RegistryEntry::Client(client) => Some((address, client)),
            RegistryEntry::Unparsed(_) => None,
        })
    }

    /// Addresses of entries that could not be read as a client
    pub fn unparsed(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry, RegistryEntry::Unparsed(_)))
            .map(|(address, _)| address)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'de> Deserialize<'de> for ClientRegistry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, serde_json::Value>::deserialize(deserializer)?;

        let entries = raw
            .into_iter()
            .map(|(address, value)| {
                let entry = match ClientConfig::deserialize(&value) {
                    Ok(client) => RegistryEntry::Client(client),
                    Err(e) => {
                        warn!(%address, error = %e, "skipping unreadable client entry");
                        RegistryEntry::Unparsed(value)
                    }
                };
                (address, entry)
            })
            .collect();

        Ok(Self { entries })
    }
}
