//! On-disk layout of the mirror.
//!
//! ```text
//! <root>/index.json                 raw index body
//! <root>/ID/<id>.json               one file per unique entry
//! <root>/<escaped module>.json      entries of one module
//! ```

use crate::error::{MirrorError, Result};
use crate::modpath::report_location;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";
pub const ID_DIR: &str = "ID";
pub const REPORT_SUFFIX: &str = ".json";

const DIR_MODE: u32 = 0o750;
const FILE_MODE: u32 = 0o640;
const INDEX_MODE: u32 = 0o660;

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Creates the output root and its `ID` directory.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Store { root: root.into() };
        create_dirs(&store.id_dir())?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn id_dir(&self) -> PathBuf {
        self.root.join(ID_DIR)
    }

    /// Path of the per-module report file for an already escaped module path.
    pub fn module_path(&self, escaped: &str) -> PathBuf {
        let (dir, file) = report_location(escaped);
        self.root.join(dir).join(file)
    }

    pub fn entry_path(&self, id: &str) -> Result<PathBuf> {
        check_entry_id(id)?;
        Ok(self.id_dir().join(format!("{id}{REPORT_SUFFIX}")))
    }

    pub fn write_index(&self, body: &[u8]) -> Result<PathBuf> {
        let path = self.index_path();
        write_file(&path, body, INDEX_MODE)?;
        Ok(path)
    }

    /// Writes a module's report file, creating intermediate directories.
    pub fn write_module(&self, escaped: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.module_path(escaped);
        if let Some(parent) = path.parent() {
            create_dirs(parent)?;
        }
        write_file(&path, contents, FILE_MODE)?;
        Ok(path)
    }

    pub fn write_entry(&self, id: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.entry_path(id)?;
        write_file(&path, contents, FILE_MODE)?;
        Ok(path)
    }
}

/// Entry ids become file names directly, so they must stay a single component.
fn check_entry_id(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        Some("empty entry id")
    } else if id.starts_with('.') {
        Some("entry id starts with a dot")
    } else if id.contains(['/', '\\', '\0']) {
        Some("entry id contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(MirrorError::PathEncoding {
            path: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn create_dirs(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir).map_err(|e| MirrorError::io(dir, e))
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).map_err(|e| MirrorError::io(path, e))?;
    // The creation mode does not apply to files left over from earlier runs.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| MirrorError::io(path, e))?;
    }
    file.write_all(contents)
        .map_err(|e| MirrorError::io(path, e))
}
