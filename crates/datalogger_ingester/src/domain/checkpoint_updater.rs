use common::domain::{CheckpointMap, ClientRegistry};
use common::registry::RegistryFile;
use tracing::{debug, info, warn};

/// Advance `last_fetch` for every client with a committed checkpoint
///
/// Watermarks only move forward: a candidate older than the current value is
/// ignored, and candidates for addresses missing from the registry are dropped.
/// Returns the addresses that were advanced.
pub fn apply_checkpoints(registry: &mut ClientRegistry, checkpoints: &CheckpointMap) -> Vec<String> {
    let mut advanced = Vec::new();

    for (address, timestamp) in checkpoints {
        let Some(client) = registry.get_mut(address) else {
            warn!(%address, "checkpoint for address not in registry, ignoring");
            continue;
        };

        if *timestamp < client.last_fetch {
            warn!(
                %address,
                current = %client.last_fetch,
                candidate = %timestamp,
                "checkpoint older than current watermark, keeping watermark"
            );
            continue;
        }

        debug!(%address, from = %client.last_fetch, to = %timestamp, "advancing watermark");
        client.last_fetch = *timestamp;
        advanced.push(address.clone());
    }

    advanced
}

/// Sole writer of the `last_fetch` watermarks
pub struct CheckpointUpdater {
    registry_file: RegistryFile,
}

impl CheckpointUpdater {
    pub fn new(registry_file: RegistryFile) -> Self {
        Self { registry_file }
    }

    /// Fold the checkpoints into the registry and rewrite the whole file once
    pub fn commit(
        &self,
        registry: &mut ClientRegistry,
        checkpoints: &CheckpointMap,
    ) -> anyhow::Result<Vec<String>> {
        let advanced = apply_checkpoints(registry, checkpoints);
        self.registry_file.save(registry)?;

        info!(
            path = %self.registry_file.path().display(),
            advanced = advanced.len(),
            "client registry updated"
        );
        Ok(advanced)
    }
}
