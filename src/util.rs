use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Longest wait handed to the timer. Anything longer is clamped to this.
pub const MAX_WAIT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Returns the instant `wait` from now, with `wait` clamped to `MAX_WAIT`.
pub fn deadline_after(wait: Duration) -> Instant {
    Instant::now() + wait.min(MAX_WAIT)
}

/// Writes `t` as pretty JSON to `path`, creating parent directories as needed.
pub fn save_json<T>(t: &T, path: &Path) -> Result<()>
where
    T: Sized + Serialize,
{
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(t)?)
        .map_err(|e| anyhow!("could not write `{}`: {}", path.display(), e))?;
    Ok(())
}

pub fn read_json<T>(path: &Path) -> Result<T>
where
    T: Sized + DeserializeOwned,
{
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
