//! `ls -la` output parsing
//!
//! In-pod directory listings come back as plain `ls -la` text. Parsing is
//! isolated here as a pure function so parsing bugs cannot mask execution
//! failures.

use serde::{Deserialize, Serialize};

/// File type derived from the permissions column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Character device
    Character,
    /// Block device
    Block,
}

impl FileKind {
    fn from_permissions(permissions: &str) -> Self {
        match permissions.chars().next() {
            Some('d') => Self::Directory,
            Some('l') => Self::Symlink,
            Some('c') => Self::Character,
            Some('b') => Self::Block,
            _ => Self::File,
        }
    }
}

/// One entry of an in-pod directory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodFileEntry {
    /// File name (spaces preserved)
    pub name: String,
    /// Entry type
    pub kind: FileKind,
    /// Raw permissions column
    pub permissions: String,
    /// Owner
    pub owner: String,
    /// Group
    pub group: String,
    /// Size in bytes (0 when the column is not numeric, e.g. devices)
    pub size: u64,
    /// Modification time columns as printed
    pub modified: String,
}

/// Parse `ls -la` output into structured entries.
///
/// Lines that do not look like listing rows (the `total` header, blanks,
/// truncated rows) are skipped rather than failing the whole listing.
#[must_use]
pub fn parse_ls_output(output: &str) -> Vec<PodFileEntry> {
    let mut entries = Vec::new();

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with("total") {
            continue;
        }

        // -rw-r--r-- 1 root root 1234 Jan  1 12:00 filename
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 9 {
            continue;
        }

        let permissions = parts[0].to_string();
        entries.push(PodFileEntry {
            kind: FileKind::from_permissions(&permissions),
            owner: parts[2].to_string(),
            group: parts[3].to_string(),
            size: parts[4].parse().unwrap_or(0),
            modified: parts[5..8].join(" "),
            name: parts[8..].join(" "),
            permissions,
        });
    }

    entries
}
