//! The persisted store document.
//!
//! The whole store is one pretty-printed JSON object:
//!
//! ```text
//! {
//!   "<project>": {
//!     "<connection>": { host, port, ..., password_encrypted: {...}, ... }
//!   }
//! }
//! ```
//!
//! There is no header and no partial update: every mutation rewrites
//! the full document through a temp file + rename.  A missing file is
//! an empty store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::record::ConnectionRecord;
use crate::errors::{Result, VaultError};

/// Connection name -> record, ordered by name.
pub type ProjectConnections = BTreeMap<String, ConnectionRecord>;

/// Project name -> connections.  Every project holds at least one
/// connection once it has passed through `read_store`.
pub type Projects = BTreeMap<String, ProjectConnections>;

/// Read the store document at `path`.
///
/// A file that does not exist yet yields an empty map.  Any other read
/// failure, or content that is not a valid store document, is an error.
/// Project entries with no connections are dropped on the way in.
pub fn read_store(path: &Path) -> Result<Projects> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Projects::new()),
        Err(source) => {
            return Err(VaultError::Persistence {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    // An empty file is treated like a missing one.
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Projects::new());
    }

    let mut projects: Projects =
        serde_json::from_slice(&data).map_err(|e| VaultError::InvalidStoreFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    projects.retain(|_, connections| !connections.is_empty());
    Ok(projects)
}

/// Write the store document to `path` **atomically**.
///
/// The JSON is written to a temp file in the same directory and then
/// renamed over the target, so readers never see a half-written file.
pub fn write_store(path: &Path, projects: &Projects) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(projects)
        .map_err(|e| VaultError::SerializationError(format!("store: {e}")))?;
    json.push(b'\n');

    let persistence = |source| VaultError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(persistence)?;
    }

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &json).map_err(persistence)?;

    // Owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600)).map_err(persistence)?;
    }

    fs::rename(&tmp_path, path).map_err(persistence)?;

    Ok(())
}
