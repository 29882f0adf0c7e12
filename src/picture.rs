use image::{ImageFormat, ImageReader};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Narrowest picture we keep. Anything smaller is treated as a thumbnail.
pub const MIN_WIDTH: u32 = 1024;
pub const MIN_HEIGHT: u32 = 768;

/// The two still-image containers recognised by header sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureFormat {
    Jpeg,
    Png,
}

impl PictureFormat {
    /// Tag appended to copied file names.
    pub fn as_str(self) -> &'static str {
        match self {
            PictureFormat::Jpeg => "jpeg",
            PictureFormat::Png => "png",
        }
    }

    fn from_sniffed(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(PictureFormat::Jpeg),
            ImageFormat::Png => Some(PictureFormat::Png),
            _ => None,
        }
    }
}

/// A landscape picture of at least `MIN_WIDTH` x `MIN_HEIGHT` found in some folder.
///
/// Values are never mutated; copying or renaming yields a new `ImageFile`
/// bound to the new location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFile {
    folder: PathBuf,
    name: String,
    format: PictureFormat,
    width: u32,
    height: u32,
}

#[derive(Debug, Error)]
enum Rejection {
    #[error("cannot open: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read dimensions: {0}")]
    Dimensions(#[from] imagesize::ImageError),

    #[error("not a jpeg or png")]
    UnsupportedFormat,

    #[error("{width}x{height} is not a landscape wallpaper")]
    Filtered { width: u32, height: u32 },
}

/// Whether the dimensions pass the thumbnail/orientation filter.
pub fn is_wallpaper(width: u32, height: u32) -> bool {
    width >= MIN_WIDTH && height >= MIN_HEIGHT && width > height
}

/// Looks at `folder/name` and returns it as an `ImageFile` if it is a qualifying picture.
///
/// Only the header is read. Unreadable, undecodable and filtered files all
/// come back as `None`; that is the normal outcome for most directory entries.
pub fn probe(folder: &Path, name: &str) -> Option<ImageFile> {
    match read_header(&folder.join(name)) {
        Ok((format, width, height)) => Some(ImageFile {
            folder: folder.to_path_buf(),
            name: name.to_string(),
            format,
            width,
            height,
        }),
        Err(reason) => {
            debug!("Skipping {}: {}", folder.join(name).display(), reason);
            None
        }
    }
}

fn read_header(path: &Path) -> Result<(PictureFormat, u32, u32), Rejection> {
    let file = File::open(path)?;
    sniff_header(&mut BufReader::new(file))
}

/// Format from the magic bytes, dimensions from the header segments.
///
/// Reading stops at the JPEG frame header or the PNG `IHDR` chunk.
fn sniff_header<R: BufRead + Seek>(reader: &mut R) -> Result<(PictureFormat, u32, u32), Rejection> {
    let format = ImageReader::new(&mut *reader)
        .with_guessed_format()?
        .format()
        .and_then(PictureFormat::from_sniffed)
        .ok_or(Rejection::UnsupportedFormat)?;
    reader.rewind()?;
    let size = imagesize::reader_size(&mut *reader)?;
    let width = u32::try_from(size.width).unwrap_or(u32::MAX);
    let height = u32::try_from(size.height).unwrap_or(u32::MAX);
    if !is_wallpaper(width, height) {
        return Err(Rejection::Filtered { width, height });
    }
    Ok((format, width, height))
}

impl ImageFile {
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> PictureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn full_path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    /// Name a copy of this picture gets in the destination: `<name>.<format>`.
    pub fn destination_name(&self) -> String {
        format!("{}.{}", self.name, self.format.as_str())
    }

    /// Writes this picture's bytes verbatim to `dest_folder/dest_name`.
    ///
    /// An existing file with that name is overwritten. The returned value
    /// carries the same format and dimensions; the copy is not probed again.
    pub fn copy_to(&self, dest_folder: &Path, dest_name: &str) -> std::io::Result<ImageFile> {
        let bytes = fs::read(self.full_path())?;
        fs::write(dest_folder.join(dest_name), bytes)?;
        Ok(ImageFile {
            folder: dest_folder.to_path_buf(),
            name: dest_name.to_string(),
            ..self.clone()
        })
    }

    /// Renames the file inside its folder and returns the value for the new name.
    pub fn renamed(&self, new_name: &str) -> std::io::Result<ImageFile> {
        fs::rename(self.full_path(), self.folder.join(new_name))?;
        Ok(ImageFile {
            name: new_name.to_string(),
            ..self.clone()
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_picture;
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::{Cursor, Read, SeekFrom};
    use tempfile::TempDir;

    #[test]
    fn test_probe_reads_format_from_header_not_extension() {
        let temp_dir = TempDir::new().unwrap();
        write_picture(&temp_dir.path().join("3f2ab91"), 1920, 1080, ImageFormat::Jpeg, 10);
        write_picture(&temp_dir.path().join("lying.jpg"), 1280, 800, ImageFormat::Png, 20);

        let jpeg = probe(temp_dir.path(), "3f2ab91").unwrap();
        assert_eq!(jpeg.format(), PictureFormat::Jpeg);
        assert_eq!((jpeg.width(), jpeg.height()), (1920, 1080));
        assert_eq!(jpeg.destination_name(), "3f2ab91.jpeg");

        let png = probe(temp_dir.path(), "lying.jpg").unwrap();
        assert_eq!(png.format(), PictureFormat::Png);
        assert_eq!(png.destination_name(), "lying.jpg.png");
    }

    #[test]
    fn test_probe_rejects_thumbnails_and_portraits() {
        let temp_dir = TempDir::new().unwrap();
        write_picture(&temp_dir.path().join("small"), 800, 600, ImageFormat::Png, 1);
        write_picture(&temp_dir.path().join("narrow"), 1023, 768, ImageFormat::Png, 2);
        write_picture(&temp_dir.path().join("short"), 1024, 767, ImageFormat::Png, 3);
        write_picture(&temp_dir.path().join("portrait"), 1080, 1920, ImageFormat::Png, 4);
        write_picture(&temp_dir.path().join("square"), 1024, 1024, ImageFormat::Png, 5);
        write_picture(&temp_dir.path().join("edge"), 1024, 768, ImageFormat::Png, 6);

        for name in ["small", "narrow", "short", "portrait", "square"] {
            assert!(probe(temp_dir.path(), name).is_none(), "{name} should be filtered");
        }
        assert!(probe(temp_dir.path(), "edge").is_some());
    }

    #[test]
    fn test_probe_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a picture").unwrap();
        write_picture(&temp_dir.path().join("pic.bmp"), 1920, 1080, ImageFormat::Bmp, 7);
        fs::create_dir(temp_dir.path().join("dir")).unwrap();

        assert!(probe(temp_dir.path(), "notes.txt").is_none());
        assert!(probe(temp_dir.path(), "pic.bmp").is_none());
        assert!(probe(temp_dir.path(), "dir").is_none());
        assert!(probe(temp_dir.path(), "missing").is_none());
    }

    #[test]
    fn test_copy_to_keeps_bytes_and_metadata() {
        let origin = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_picture(&origin.path().join("abc"), 1600, 900, ImageFormat::Jpeg, 30);

        let source = probe(origin.path(), "abc").unwrap();
        let copy = source.copy_to(dest.path(), "abc.jpeg").unwrap();

        assert_eq!(copy.folder(), dest.path());
        assert_eq!(copy.name(), "abc.jpeg");
        assert_eq!((copy.width(), copy.height()), (1600, 900));
        assert_eq!(
            fs::read(source.full_path()).unwrap(),
            fs::read(copy.full_path()).unwrap()
        );
        assert_eq!(source.folder(), origin.path());
    }

    #[test]
    fn test_renamed_moves_file_and_returns_new_value() {
        let temp_dir = TempDir::new().unwrap();
        write_picture(&temp_dir.path().join("old.png"), 1280, 960, ImageFormat::Png, 40);

        let original = probe(temp_dir.path(), "old.png").unwrap();
        let renamed = original.renamed("beach.png").unwrap();

        assert_eq!(original.name(), "old.png");
        assert_eq!(renamed.name(), "beach.png");
        assert!(!temp_dir.path().join("old.png").exists());
        assert_eq!(probe(temp_dir.path(), "beach.png"), Some(renamed));
    }

    /// Counts bytes pulled from the wrapped reader.
    struct CountingReader<R> {
        inner: R,
        bytes_read: u64,
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl<R: Seek> Seek for CountingReader<R> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn encoded_with_tail(format: ImageFormat, tail: usize) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbImage::from_pixel(1920, 1080, Rgb([90, 60, 30]))
            .write_to(&mut bytes, format)
            .unwrap();
        let mut bytes = bytes.into_inner();
        bytes.resize(bytes.len() + tail, 0);
        bytes
    }

    #[test]
    fn test_header_read_stops_before_body() {
        const TAIL: usize = 16 * 1024 * 1024;
        for format in [ImageFormat::Jpeg, ImageFormat::Png] {
            let mut reader = BufReader::new(CountingReader {
                inner: Cursor::new(encoded_with_tail(format, TAIL)),
                bytes_read: 0,
            });

            let (_, width, height) = sniff_header(&mut reader).unwrap();
            assert_eq!((width, height), (1920, 1080));
            let bytes_read = reader.get_ref().bytes_read;
            assert!(bytes_read < 256 * 1024, "{format:?} read {bytes_read} bytes");
        }
    }

    #[test]
    fn test_probe_handles_jpeg_with_large_trailer() {
        let temp_dir = TempDir::new().unwrap();
        let bytes = encoded_with_tail(ImageFormat::Jpeg, 32 * 1024 * 1024);
        fs::write(temp_dir.path().join("padded"), bytes).unwrap();

        let found = probe(temp_dir.path(), "padded").unwrap();
        assert_eq!(found.format(), PictureFormat::Jpeg);
        assert_eq!((found.width(), found.height()), (1920, 1080));
    }

    #[test]
    fn test_copy_fails_when_source_vanished() {
        let origin = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_picture(&origin.path().join("gone"), 1600, 900, ImageFormat::Png, 50);

        let source = probe(origin.path(), "gone").unwrap();
        fs::remove_file(source.full_path()).unwrap();
        assert!(source.copy_to(dest.path(), "gone.png").is_err());
        assert!(!dest.path().join("gone.png").exists());
    }
}
