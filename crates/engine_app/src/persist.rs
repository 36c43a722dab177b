//! Snapshot files on disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use engine_ecs::Registry;
use tracing::info;

/// Save `registry` with the global type table to `path`.
pub fn save_to_file(registry: &Registry, path: &Path) -> Result<Vec<u8>> {
    let bytes = registry
        .save_global()
        .context("failed to encode world snapshot")?;
    fs::write(path, &bytes)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote world snapshot");
    Ok(bytes)
}

/// Load a registry previously written by [`save_to_file`].
pub fn load_from_file(path: &Path) -> Result<Registry> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
    Registry::load_global(&bytes)
        .with_context(|| format!("failed to decode snapshot {}", path.display()))
}

/// Check that saving `restored` reproduces `written` exactly.
pub fn verify_stable(restored: &Registry, written: &[u8]) -> Result<()> {
    let again = restored
        .save_global()
        .context("reloaded world did not re-encode")?;
    ensure!(
        again == written,
        "snapshot is not stable: {} bytes re-encoded as {} bytes",
        written.len(),
        again.len()
    );
    Ok(())
}

/// Reload `bytes` and check that saving again reproduces them exactly.
pub fn verify_round_trip(bytes: &[u8]) -> Result<Registry> {
    let restored = Registry::load_global(bytes).context("snapshot did not reload")?;
    verify_stable(&restored, bytes)?;
    Ok(restored)
}
