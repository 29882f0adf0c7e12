use crate::error::{FetchError, Result};
use crate::hash::{ContentHash, hash_file};
use crate::ledger::{LEDGER_FILE_NAME, Ledger, is_plain_name};
use crate::picture::{self, ImageFile};
use crate::scanner::scan;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Counters for one run. Failed items are retried on the next run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Destination pictures that had no ledger entry and were added.
    pub healed: usize,
    pub hash_failures: usize,
    pub copy_failures: usize,
    pub copied: usize,
    pub copied_bytes: u64,
}

/// What a run hands back to whoever displays the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub origin: PathBuf,
    pub destination: PathBuf,
    /// Ledger entries that still resolve to a qualifying picture, as of before this run.
    pub existing: Vec<ImageFile>,
    /// Pictures copied into the destination by this run.
    pub new_files: Vec<ImageFile>,
    pub stats: RunStats,
}

/// Location of the ledger for a destination folder.
pub fn ledger_path(dest_folder: &Path) -> PathBuf {
    dest_folder.join(LEDGER_FILE_NAME)
}

/// Copies every picture in `origin` whose content is not yet known to `dest`.
///
/// The ledger is first brought up to date with whatever already sits in
/// `dest`, then each new fingerprint from `origin` is copied as
/// `<name>.<format>`. The ledger is written once at the end, also when
/// nothing was copied. Per-file hash and copy failures are logged and
/// skipped; only listing a folder or reading/writing the ledger can fail.
///
/// Not safe against another run on the same `dest` at the same time.
pub fn reconcile(origin: &Path, dest: &Path) -> Result<ProcessResult> {
    reconcile_with(origin, dest, hash_file)
}

fn reconcile_with(
    origin: &Path,
    dest: &Path,
    hasher: fn(&Path) -> std::io::Result<ContentHash>,
) -> Result<ProcessResult> {
    let origin = resolve(origin)?;
    let dest = resolve(dest)?;
    let ledger_file = ledger_path(&dest);

    let mut ledger = Ledger::load(&ledger_file)?;
    let mut stats = RunStats::default();

    let existing: Vec<ImageFile> = ledger
        .names()
        .filter(|name| {
            let plain = is_plain_name(name);
            if !plain {
                warn!("Ignoring ledger entry {:?} outside the destination folder", name);
            }
            plain
        })
        .filter_map(|name| picture::probe(&dest, name))
        .collect();

    for image in scan(&dest)? {
        if ledger.contains_name(image.name()) {
            continue;
        }
        match hasher(&image.full_path()) {
            Ok(hash) => {
                info!("Added untracked {} to the ledger", image.name());
                ledger.insert(image.name(), hash.fingerprint);
                stats.healed += 1;
            }
            Err(e) => {
                warn!("Cannot hash {}: {}", image.full_path().display(), e);
                stats.hash_failures += 1;
            }
        }
    }

    let mut new_files = Vec::new();
    for image in scan(&origin)? {
        let hash = match hasher(&image.full_path()) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Cannot hash {}: {}", image.full_path().display(), e);
                stats.hash_failures += 1;
                continue;
            }
        };
        if ledger.contains_fingerprint(&hash.fingerprint) {
            continue;
        }

        let dest_name = image.destination_name();
        let copy = match image.copy_to(&dest, &dest_name) {
            Ok(copy) => copy,
            Err(e) => {
                warn!("Cannot copy {} to {}: {}", image.full_path().display(), dest_name, e);
                stats.copy_failures += 1;
                continue;
            }
        };

        info!(
            "File copied: {} ({}x{}, {} kb)",
            dest_name,
            copy.width(),
            copy.height(),
            hash.size / 1024
        );
        ledger.insert(dest_name, hash.fingerprint);
        stats.copied += 1;
        stats.copied_bytes += hash.size;
        new_files.push(copy);
    }

    info!("Finished copying; {} new picture(s) found in total", stats.copied);
    ledger.save(&ledger_file)?;

    Ok(ProcessResult {
        origin,
        destination: dest,
        existing,
        new_files,
        stats,
    })
}

fn resolve(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| FetchError::ResolvePath {
        path: path.to_path_buf(),
        source,
    })
}
