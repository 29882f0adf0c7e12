//! Copies new wallpaper-sized pictures from an origin folder into a
//! destination folder, using a `CheckSums.txt` ledger of content hashes in
//! the destination to recognise pictures it already has.

pub mod error;
pub mod hash;
pub mod ledger;
pub mod picture;
pub mod reconcile;
pub mod scanner;
pub mod verify;

pub use error::{FetchError, Result};
pub use hash::{ContentHash, Fingerprint, hash_file};
pub use ledger::{LEDGER_FILE_NAME, Ledger};
pub use picture::{ImageFile, PictureFormat, probe};
pub use reconcile::{ProcessResult, RunStats, ledger_path, reconcile};
pub use scanner::scan;
pub use verify::{Problem, audit};
