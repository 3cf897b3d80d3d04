//! Content-addressed on-disk cache with mtime-based TTL.
//!
//! Entries are keyed by URL (plus sorted query parameters, since the key is
//! the full URL string) and stored under a SHA-256 filename. A read is
//! absent when the file is missing, older than the TTL, or unparseable; the
//! caller re-fetches and writes a fresh entry. There is no eviction beyond
//! the TTL check.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a cached JSON payload, honoring the TTL. `ttl_hours == 0`
    /// disables expiry. Corrupt payloads read as absent.
    pub fn get_json(&self, key: &str, ttl_hours: u64) -> Option<Value> {
        let path = self.entry_path(key, "json");
        if !Self::is_fresh(&path, ttl_hours) {
            return None;
        }
        let text = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&text).ok()
    }

    pub fn set_json(&self, key: &str, value: &Value) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key, "json");
        std::fs::write(path, serde_json::to_string(value)?.as_bytes())
    }

    /// Read a cached raw blob (ZIP mirrors) with the same TTL policy.
    pub fn get_bytes(&self, key: &str, ttl_hours: u64) -> Option<Vec<u8>> {
        let path = self.entry_path(key, "bin");
        if !Self::is_fresh(&path, ttl_hours) {
            return None;
        }
        std::fs::read(&path).ok()
    }

    pub fn set_bytes(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.entry_path(key, "bin"), bytes)
    }

    pub fn entry_path(&self, key: &str, ext: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let mut name = String::with_capacity(digest.len() * 2 + ext.len() + 1);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push('.');
        name.push_str(ext);
        self.dir.join(name)
    }

    fn is_fresh(path: &Path, ttl_hours: u64) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        if ttl_hours == 0 {
            return true;
        }
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age.as_secs() <= ttl_hours * 3_600,
            // Clock skew put the mtime in the future; treat as fresh.
            Err(_) => true,
        }
    }
}
