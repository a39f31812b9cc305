//! Plain-text checkpoint file.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use eyre::{eyre, Result, WrapErr};

use super::CheckpointStore;

/// Checkpoint kept as a decimal block number in a single small file.
///
/// Writes go to a sibling temp file that is then renamed over the original, so a crash never
/// leaves a half-written number behind.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpoint {
    fn load_checkpoint(&self) -> Result<Option<u64>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("reading {}", self.path.display()));
            }
        };

        let text = String::from_utf8_lossy(&raw);
        let text = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());
        if text.is_empty() {
            return Ok(None);
        }

        text.parse::<u64>()
            .map(Some)
            .map_err(|e| eyre!("invalid checkpoint {:?} in {}: {e}", text, self.path.display()))
    }

    fn save_checkpoint(&self, block_number: u64) -> Result<()> {
        let tmp = self.tmp_path();
        {
            let mut file =
                File::create(&tmp).wrap_err_with(|| format!("creating {}", tmp.display()))?;
            file.write_all(block_number.to_string().as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path).wrap_err_with(|| format!("replacing {}", self.path.display()))
    }
}
