use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use url::Url;

use crate::document::MediaDescriptor;

// @module: File and directory utilities

// @const: Extensions ffmpeg is expected to handle
const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "ogg", "opus", "aif", "aiff", "mp4", "mkv", "avi", "mov", "wmv",
    "webm", "m4v", "mpg", "mpeg",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    /// Read a whole file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    // @generates: Default bundle directory next to the annotation file
    pub fn default_output_dir<P: AsRef<Path>>(document: P) -> PathBuf {
        let document = document.as_ref();
        let stem = document.file_stem().unwrap_or_default().to_string_lossy();
        let parent = document.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}_bundle", stem))
    }

    /// Locate the recording a document's header points to.
    ///
    /// Relative URLs are tried first and resolved against the document's
    /// directory, then absolute URLs, then a file with the same name sitting
    /// next to the document.
    pub fn resolve_media_path<P: AsRef<Path>>(document: P, media: &[MediaDescriptor]) -> Option<PathBuf> {
        let base = document
            .as_ref()
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let relative = media
            .iter()
            .filter_map(|m| m.relative_media_url.as_deref())
            .filter_map(|url| media_url_to_path(url, base));
        let absolute = media.iter().filter_map(|m| media_url_to_path(&m.media_url, base));
        let sibling = media.iter().filter_map(|m| {
            media_url_to_path(&m.media_url, base)
                .and_then(|path| path.file_name().map(|name| base.join(name)))
        });

        relative.chain(absolute).chain(sibling).find(|p| Self::file_exists(p))
    }

    /// Detect whether a file is an annotation document, a WAV file or other media
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            match ext_str.as_str() {
                "eaf" => return Ok(FileType::Annotation),
                "wav" | "wave" => return Ok(FileType::Wav),
                e if MEDIA_EXTENSIONS.contains(&e) => return Ok(FileType::Media),
                _ => {}
            }
        }

        // Fall back to sniffing the first bytes
        let mut head = [0u8; 512];
        let read = fs::File::open(path)
            .and_then(|mut file| file.read(&mut head))
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        let head = &head[..read];

        if head.starts_with(b"RIFF") && head.get(8..12) == Some(b"WAVE".as_slice()) {
            return Ok(FileType::Wav);
        }
        if String::from_utf8_lossy(head).contains("<ANNOTATION_DOCUMENT") {
            return Ok(FileType::Annotation);
        }

        Ok(FileType::Unknown)
    }
}

// Media URLs in annotation headers are percent-encoded file:// URLs or
// URLs relative to the document's directory
fn media_url_to_path(url: &str, base: &Path) -> Option<PathBuf> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "file" => parsed.to_file_path().ok(),
        // A bare Windows drive path parses with the drive letter as scheme
        Ok(parsed) if parsed.scheme().len() == 1 => Some(PathBuf::from(url)),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base_url = Url::from_directory_path(std::path::absolute(base).ok()?).ok()?;
            base_url.join(url).ok()?.to_file_path().ok()
        }
        Err(_) => None,
    }
}

/// Enum representing different file types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Tiered annotation document (EAF)
    Annotation,
    /// WAV audio read directly
    Wav,
    /// Other media that needs transcoding
    Media,
    /// Unknown file type
    Unknown,
}
