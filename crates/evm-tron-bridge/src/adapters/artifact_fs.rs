//! Filesystem artifact repository for Foundry (`out/`) and Hardhat
//! (`artifacts/`) build trees.
//!
//! Files are re-parsed only when their modification time changes, so a
//! recompile between two deployments is picked up without a restart.

use crate::domain::{BridgeError, ConstructorArtifact};
use crate::ports::ArtifactRepository;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

const BUILD_INFO_DIR: &str = "build-info";

struct CachedFile {
    modified: SystemTime,
    /// `None` when the file is not a deployable artifact.
    artifact: Option<ConstructorArtifact>,
}

pub struct FsArtifactRepository {
    root: PathBuf,
    cache: Mutex<HashMap<PathBuf, CachedFile>>,
}

impl FsArtifactRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactRepository for FsArtifactRepository {
    fn artifacts(&self) -> Result<Vec<ConstructorArtifact>, BridgeError> {
        if !self.root.exists() {
            warn!(root = %self.root.display(), "Artifact directory does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        collect_json_files(&self.root, &mut files)?;

        let mut cache = self.cache.lock();
        cache.retain(|path, _| files.contains(path));

        let mut artifacts = Vec::new();
        for path in files {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|e| io_error(&path, e))?;

            let fresh = matches!(cache.get(&path), Some(cached) if cached.modified == modified);
            if !fresh {
                let text = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
                let artifact = parse_artifact(&path, &text);
                cache.insert(path.clone(), CachedFile { modified, artifact });
            }
            if let Some(artifact) = cache.get(&path).and_then(|c| c.artifact.clone()) {
                artifacts.push(artifact);
            }
        }
        Ok(artifacts)
    }
}

/// Depth-first, entries sorted by path at every level.
fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BridgeError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| io_error(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_error(dir, e))?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if path.file_name().is_some_and(|name| name == BUILD_INFO_DIR) {
                continue;
            }
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> BridgeError {
    BridgeError::Artifact(format!("{}: {}", path.display(), e))
}

/// Foundry keeps creation code under `bytecode.object`, Hardhat under
/// `bytecode` directly.
fn parse_artifact(path: &Path, text: &str) -> Option<ConstructorArtifact> {
    let json: Value = match serde_json::from_str(text) {
        Ok(json) => json,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping non-JSON file");
            return None;
        }
    };

    let abi = json.get("abi").filter(|abi| abi.is_array())?.clone();
    let bytecode = json
        .get("bytecode")
        .and_then(|b| b.get("object").or(Some(b)))
        .and_then(Value::as_str)?;
    let digits = bytecode.strip_prefix("0x").unwrap_or(bytecode);

    if digits.contains("__") {
        warn!(path = %path.display(), "Skipping artifact with unlinked library placeholders");
        return None;
    }
    let bytecode = match hex::decode(digits) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            debug!(path = %path.display(), "Skipping artifact without creation code");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping artifact with invalid bytecode");
            return None;
        }
    };

    let name = json
        .get("contractName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    Some(ConstructorArtifact {
        name,
        source: path.to_path_buf(),
        bytecode,
        abi,
    })
}
