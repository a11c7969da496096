//! Directory-backed workspace store
//!
//! Two files: `workspaces.json` (the whole collection) and
//! `current_workspace_id` (the active pointer as a decimal string).

use super::traits::{decode_active, decode_workspaces, StoreError, StoredState, WorkspaceStore};
use crate::workspace::{WorkspaceId, Workspaces};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const WORKSPACES_FILE: &str = "workspaces.json";
const ACTIVE_FILE: &str = "current_workspace_id";

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, name: &str) -> Option<String> {
        let path = self.dir.join(name);
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Failed to read store file");
                None
            }
        }
    }

    /// Write through a temp file so readers never see a partial blob
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let final_path = self.dir.join(name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));

        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path)?;
                    fs::rename(&tmp_path, &final_path)
                } else {
                    Err(rename_err)
                }
            }
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl WorkspaceStore for JsonFileStore {
    fn load(&self) -> StoredState {
        StoredState {
            workspaces: self
                .read(WORKSPACES_FILE)
                .map(|raw| decode_workspaces(&raw))
                .unwrap_or_default(),
            active: self.read(ACTIVE_FILE).and_then(|raw| decode_active(&raw)),
        }
    }

    fn save_all(&self, workspaces: &Workspaces) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(workspaces)?;
        self.write_atomic(WORKSPACES_FILE, &bytes)?;
        Ok(())
    }

    fn set_active(&self, id: WorkspaceId) -> Result<(), StoreError> {
        self.write_atomic(ACTIVE_FILE, id.to_string().as_bytes())?;
        Ok(())
    }

    fn clear_active(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.dir.join(ACTIVE_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
