use crate::error::Result;
use crate::hash::{Fingerprint, hash_file};
use crate::ledger::{Ledger, is_plain_name};
use crate::scanner::scan;
use serde::Serialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

/// A disagreement between the ledger and the destination folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Problem {
    /// The ledger names a file that is no longer there.
    Missing { name: String },
    /// The file's bytes no longer match the recorded fingerprint.
    Stale {
        name: String,
        recorded: Fingerprint,
        actual: Fingerprint,
    },
    Unreadable { name: String, error: String },
    /// The ledger name is not a bare file name, so it was not looked up.
    Invalid { name: String },
    /// A picture in the folder with no ledger entry.
    Untracked { name: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing { name } => write!(f, "missing    {name}"),
            Problem::Stale {
                name,
                recorded,
                actual,
            } => write!(f, "stale      {name} (recorded {recorded}, now {actual})"),
            Problem::Unreadable { name, error } => write!(f, "unreadable {name}: {error}"),
            Problem::Invalid { name } => write!(f, "invalid    {name:?}"),
            Problem::Untracked { name } => write!(f, "untracked  {name}"),
        }
    }
}

/// Re-hashes every ledger entry in `dest` and looks for untracked pictures.
///
/// Read-only: nothing is repaired. `on_checked` is called once per ledger
/// entry after it has been hashed.
pub fn audit(dest: &Path, ledger: &Ledger, mut on_checked: impl FnMut(&str)) -> Result<Vec<Problem>> {
    let mut problems = Vec::new();

    let mut entries: Vec<_> = ledger.entries().collect();
    entries.sort();
    for (name, recorded) in entries {
        if !is_plain_name(name) {
            problems.push(Problem::Invalid {
                name: name.to_string(),
            });
            on_checked(name);
            continue;
        }
        match hash_file(&dest.join(name)) {
            Ok(hash) if &hash.fingerprint == recorded => {}
            Ok(hash) => problems.push(Problem::Stale {
                name: name.to_string(),
                recorded: recorded.clone(),
                actual: hash.fingerprint,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => problems.push(Problem::Missing {
                name: name.to_string(),
            }),
            Err(e) => problems.push(Problem::Unreadable {
                name: name.to_string(),
                error: e.to_string(),
            }),
        }
        on_checked(name);
    }

    let mut untracked: Vec<String> = scan(dest)?
        .into_iter()
        .filter(|image| !ledger.contains_name(image.name()))
        .map(|image| image.name().to_string())
        .collect();
    untracked.sort();
    problems.extend(untracked.into_iter().map(|name| Problem::Untracked { name }));

    Ok(problems)
}
