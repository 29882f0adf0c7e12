use crate::error::{FetchError, Result};
use crate::picture::{self, ImageFile};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Lists the immediate files of `folder` and keeps the qualifying pictures.
///
/// Subdirectories are skipped, not descended into. The result follows the
/// directory listing order, which is not sorted. Failing to list the folder
/// is fatal for the run.
pub fn scan(folder: &Path) -> Result<Vec<ImageFile>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| FetchError::ListFolder {
            path: folder.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };

        if let Some(image) = picture::probe(folder, name) {
            images.push(image);
        }
    }
    debug!("Found {} picture(s) in {}", images.len(), folder.display());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::fixtures::write_picture;
    use image::ImageFormat;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_keeps_only_qualifying_top_level_pictures() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_picture(&root.join("wide"), 1920, 1080, ImageFormat::Jpeg, 1);
        write_picture(&root.join("thumb"), 800, 600, ImageFormat::Jpeg, 2);
        fs::write(root.join("CheckSums.txt"), "wide : abc\n").unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        write_picture(&root.join("nested").join("deep"), 1920, 1080, ImageFormat::Png, 3);

        let found = scan(root).unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["wide"]);
    }

    #[test]
    fn test_scan_of_empty_folder_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(scan(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_of_missing_folder_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        match scan(&missing) {
            Err(FetchError::ListFolder { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected ListFolder error, got {other:?}"),
        }
    }
}
