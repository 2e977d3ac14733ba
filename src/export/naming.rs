/*!
 * Clip filename construction and collision-free reservation.
 */

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::app_config::NamingScheme;

// @const: Runs of anything that is not a letter or digit
static NON_WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Filename options derived from the export configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingOptions {
    pub scheme: NamingScheme,
    pub excerpt_max_chars: usize,
    pub index_width: usize,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            scheme: NamingScheme::IndexAndText,
            excerpt_max_chars: 32,
            index_width: 4,
        }
    }
}

/// Reduce free text to a filesystem-safe excerpt of at most `max_chars` characters
pub fn sanitize_excerpt(text: &str, max_chars: usize) -> String {
    let replaced = NON_WORD_REGEX.replace_all(text.trim(), "_").to_lowercase();
    let truncated: String = replaced.trim_matches('_').chars().take(max_chars).collect();
    truncated.trim_end_matches('_').to_string()
}

/// File stem for a record, before collision handling
pub fn clip_stem(index: usize, text: &str, options: &NamingOptions) -> String {
    let number = format!("{:0width$}", index, width = options.index_width);
    let excerpt = || sanitize_excerpt(text, options.excerpt_max_chars);

    match options.scheme {
        NamingScheme::IndexOnly => number,
        NamingScheme::IndexAndText => match excerpt() {
            e if e.is_empty() => number,
            e => format!("{}_{}", number, e),
        },
        NamingScheme::TextOnly => match excerpt() {
            e if e.is_empty() => format!("clip_{}", number),
            e => e,
        },
    }
}

/// Hands out file names in one directory, never twice and never over an existing file
#[derive(Debug)]
pub struct FilenameReserver {
    dir: PathBuf,
    reserved: Mutex<HashSet<String>>,
}

impl FilenameReserver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve `stem.extension`, or `stem_1.extension`, `stem_2.extension`, ... when taken
    pub fn reserve(&self, stem: &str, extension: &str) -> PathBuf {
        let mut reserved = self.reserved.lock();
        let mut suffix = 0usize;
        loop {
            let name = if suffix == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}_{}.{}", stem, suffix, extension)
            };
            // Compare case-insensitively so names stay distinct on case-folding filesystems
            let key = name.to_lowercase();
            let path = self.dir.join(&name);
            if !reserved.contains(&key) && !path.exists() {
                reserved.insert(key);
                return path;
            }
            suffix += 1;
        }
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.lock().len()
    }
}
