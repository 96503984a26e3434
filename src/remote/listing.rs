/*!
 * LIST output parsing and remote path arithmetic
 */

use std::sync::LazyLock;

use regex::Regex;

/// Remote root path
pub const ROOT: &str = "/";

/// `drwxr-xr-x  2 owner group  4096 Jan 01 12:00 name`
static UNIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([dlbcps-])[rwxsStTlL-]{9}[+@.]?\s+\d+\s+\S+\s+\S+\s+\d+\s+\w{3}\s+\d{1,2}\s+(?:\d{1,2}:\d{2}|\d{4})\s+(.+)$",
    )
    .expect("valid unix listing regex")
});

/// `01-15-24  10:21AM       <DIR>          name`
static DOS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}-\d{2}-\d{2,4}\s+\d{1,2}:\d{2}(?:[AaPp][Mm])?\s+(<DIR>|\d+)\s+(.+)$")
        .expect("valid dos listing regex")
});

/// Extract child directory names from raw `LIST` lines.
///
/// Unix and DOS style listings are classified by their type column. Lines
/// in any other format fall back to "last token, and it has no dot".
pub fn directory_names(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| directory_name(line.trim_end_matches(['\r', '\n'])))
        .filter(|name| name != "." && name != "..")
        .collect()
}

fn directory_name(line: &str) -> Option<String> {
    if let Some(caps) = UNIX_LINE.captures(line) {
        let name = caps[2].to_string();
        return match &caps[1] {
            "d" => Some(name),
            // Symlinks: keep the link name, guess from the target like the fallback
            "l" => {
                let (link, target) = name
                    .split_once(" -> ")
                    .unwrap_or((name.as_str(), name.as_str()));
                (!target.contains('.')).then(|| link.to_string())
            }
            _ => None,
        };
    }

    if let Some(caps) = DOS_LINE.captures(line) {
        return (&caps[1] == "<DIR>").then(|| caps[2].to_string());
    }

    line.split_whitespace()
        .last()
        .filter(|token| !token.contains('.'))
        .map(str::to_string)
}

/// Collapse duplicate separators and trailing slashes; always absolute
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// `path/child`
pub fn join_path(path: &str, child: &str) -> String {
    normalize_path(&format!("{}/{}", path, child))
}

/// Parent directory; the parent of the root is the root
pub fn parent_path(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}
