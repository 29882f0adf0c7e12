use blake3::Hasher as Blake3Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lowercase hex content digest. Two files with equal fingerprints are the same picture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps a digest string exactly as read from a ledger line.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint plus the number of bytes that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    pub fingerprint: Fingerprint,
    pub size: u64,
}

/// BLAKE3 over the complete file contents.
///
/// The size is for display only and plays no part in identity.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Blake3Hasher::new();
    let mut size = 0u64;

    let mut buffer = [0u8; 65536];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(ContentHash {
        fingerprint: Fingerprint(hasher.finalize().to_hex().to_string()),
        size,
    })
}
