//! The `CheckSums.txt` sidecar: one `name : fingerprint` line per known picture.
//!
//! Names containing `:` or line breaks cannot be represented.

use crate::error::{FetchError, Result};
use crate::hash::Fingerprint;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

pub const LEDGER_FILE_NAME: &str = "CheckSums.txt";

/// Whether `name` is a bare file name that stays inside the folder it is joined to.
pub fn is_plain_name(name: &str) -> bool {
    Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Name to fingerprint index of a destination folder, with its inverse.
///
/// Both directions are only ever changed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    by_name: HashMap<String, Fingerprint>,
    by_fingerprint: HashMap<Fingerprint, String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the ledger at `path`. A missing file is an empty ledger.
    ///
    /// Lines with fewer than two `:` separated fields are skipped. For
    /// repeated names or fingerprints the later line wins.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(FetchError::LoadLedger {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(Self::parse(&content))
    }

    /// Parses ledger text. Extra fields after the second are ignored.
    pub fn parse(content: &str) -> Self {
        let mut ledger = Self::new();
        for line in content.lines() {
            let mut parts = line.split(':');
            let (Some(name), Some(fingerprint)) = (parts.next(), parts.next()) else {
                continue;
            };
            ledger.insert(name.trim(), Fingerprint::new(fingerprint.trim()));
        }
        ledger
    }

    /// Rewrites the whole ledger file. Lines are sorted by name.
    ///
    /// The content goes to a sibling temp file first and is renamed over
    /// `path`, so an interrupted write leaves the previous ledger intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let fail = |source| FetchError::SaveLedger {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        let mut out = BufWriter::new(File::create(tmp_path).map_err(fail)?);
        out.write_all(self.render().as_bytes()).map_err(fail)?;
        out.into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all())
            .map_err(fail)?;
        fs::rename(tmp_path, path).map_err(fail)
    }

    /// The on-disk text form.
    pub fn render(&self) -> String {
        let mut entries: Vec<_> = self.by_name.iter().collect();
        entries.sort();
        entries
            .into_iter()
            .map(|(name, fingerprint)| format!("{name} : {fingerprint}\n"))
            .collect()
    }

    /// Records `name` as holding `fingerprint`, updating both directions.
    pub fn insert(&mut self, name: impl Into<String>, fingerprint: Fingerprint) {
        let name = name.into();
        self.by_name.insert(name.clone(), fingerprint.clone());
        self.by_fingerprint.insert(fingerprint, name);
    }

    /// Moves the entry for `old` to `new`. Returns `false` if `old` is unknown.
    pub fn rename_entry(&mut self, old: &str, new: &str) -> bool {
        let Some(fingerprint) = self.by_name.remove(old) else {
            return false;
        };
        if self.by_fingerprint.get(&fingerprint).map(String::as_str) == Some(old) {
            self.by_fingerprint.remove(&fingerprint);
        }
        self.insert(new, fingerprint);
        true
    }

    pub fn fingerprint_of(&self, name: &str) -> Option<&Fingerprint> {
        self.by_name.get(name)
    }

    pub fn name_of(&self, fingerprint: &Fingerprint) -> Option<&str> {
        self.by_fingerprint.get(fingerprint).map(String::as_str)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        self.by_fingerprint.contains_key(fingerprint)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.by_name.iter().map(|(name, fp)| (name.as_str(), fp))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
