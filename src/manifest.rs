use std::collections::HashMap;

use md5::{Digest, Md5};
use tracing::debug;

pub const MANIFEST_FILE_NAME: &str = "md5checksums.txt";

/// Expected MD5 sums for the files of one assembly directory, keyed by file
/// name with the leading `./` removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumManifest {
    entries: HashMap<String, String>,
}

impl ChecksumManifest {
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(checksum), Some(path)) = (parts.next(), parts.next()) else {
                if !line.trim().is_empty() {
                    debug!("ignoring malformed checksum line: {line:?}");
                }
                continue;
            };
            let name = path.trim_start_matches(['.', '/']);
            entries.insert(name.to_string(), checksum.to_ascii_lowercase());
        }
        Self { entries }
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn md5_hex(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

pub fn checksum_matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
