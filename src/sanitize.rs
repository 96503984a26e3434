/*!
 * Category label to folder name conversion
 *
 * Labels come straight out of manifest cells: they can hold path
 * separators, line breaks, commas and arbitrary length. The sanitized form
 * is a single bounded path component that is stable across runs, so
 * re-running a harvest files archives into the same folders.
 */

use md5::{Digest, Md5};

/// Default bound on folder name length, in characters
pub const DEFAULT_MAX_LEN: usize = 50;

/// Number of hex digits appended to shortened names
pub const HASH_SUFFIX_LEN: usize = 8;

/// Name used when nothing survives sanitization
pub const FALLBACK_NAME: &str = "Unknown";

/// Characters that may not appear in a path component on common filesystems
const ILLEGAL_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Turns manifest labels into safe, bounded folder names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSanitizer {
    max_len: usize,
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl NameSanitizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Sanitize `label` into a folder name of at most `max_len` characters.
    ///
    /// Overlong names keep their first `max_len - 8` characters and gain the
    /// first 8 hex digits of the MD5 of the full cleaned label.
    pub fn sanitize(&self, label: &str) -> String {
        let cleaned = clean_label(label);

        // "." and ".." would resolve outside the category root
        if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
            return FALLBACK_NAME.to_string();
        }

        if cleaned.chars().count() <= self.max_len {
            return cleaned;
        }

        let digest = hex::encode(Md5::digest(cleaned.as_bytes()));
        let suffix_len = HASH_SUFFIX_LEN.min(self.max_len);
        let keep = self.max_len - suffix_len;

        let mut name: String = cleaned.chars().take(keep).collect();
        name.push_str(&digest[..suffix_len]);
        name
    }
}

/// Sanitize with an explicit bound
pub fn sanitize_folder_name(label: &str, max_len: usize) -> String {
    NameSanitizer::new(max_len).sanitize(label)
}

/// Drop illegal characters, turn newlines and commas into spaces, collapse
/// whitespace runs and trim.
fn clean_label(label: &str) -> String {
    let spaced: String = label
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .map(|c| if c == '\n' || c == ',' { ' ' } else { c })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
