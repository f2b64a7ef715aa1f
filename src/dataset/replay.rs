// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Replay of a recorded frame sequence as a frame source.
//!
//! The sequence is described by an index file with one
//! `timestamp image_path` pair per line. Blank lines and `#` comments
//! are skipped.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::capture::{CameraFrame, CaptureError, FrameSource};

/// One line of the sequence index.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Capture timestamp of the frame, in seconds.
    pub timestamp: f64,
    /// Path of the image file.
    pub file_path: PathBuf,
}

/// Parse the content of a sequence index.
pub fn parse_index(file_content: &str) -> Result<Vec<Entry>, String> {
    let mut entries = Vec::new();
    for line in file_content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(stamp), Some(path)) => {
                let timestamp = stamp
                    .parse()
                    .map_err(|_| format!("invalid timestamp in line: {}", line))?;
                entries.push(Entry {
                    timestamp,
                    file_path: PathBuf::from(path),
                });
            }
            _ => return Err(format!("invalid index line: {}", line)),
        }
    }
    Ok(entries)
}

/// Read an index file, resolving image paths relative to its directory.
pub fn read_index<P: AsRef<Path>>(index_path: P) -> Result<Vec<Entry>, Box<dyn Error>> {
    let content = fs::read_to_string(&index_path)?;
    let root = index_path.as_ref().parent().unwrap_or_else(|| Path::new("."));
    let mut entries = parse_index(&content)?;
    for entry in &mut entries {
        entry.file_path = root.join(&entry.file_path);
    }
    Ok(entries)
}

/// Replays a parsed sequence, decoding one image per capture.
pub struct ReplaySource {
    entries: Vec<Entry>,
    cursor: usize,
}

impl ReplaySource {
    /// Source over the given entries, in order.
    pub fn new(entries: Vec<Entry>) -> ReplaySource {
        ReplaySource { entries, cursor: 0 }
    }
}

impl FrameSource for ReplaySource {
    fn capture(&mut self) -> Result<CameraFrame, CaptureError> {
        let entry = match self.entries.get(self.cursor) {
            Some(entry) => entry,
            None => return Err(CaptureError::Exhausted),
        };
        self.cursor += 1;
        let pixels = image::open(&entry.file_path)?.to_rgb8();
        Ok(CameraFrame {
            pixels,
            timestamp: entry.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parses_timestamps_and_paths() {
        let content = "# frames of run 3\n\n0.0 frames/000.png\n0.1 frames/001.png\n";
        let entries = parse_index(content).unwrap();
        assert_eq!(2, entries.len());
        assert_eq!(0.1, entries[1].timestamp);
        assert_eq!(PathBuf::from("frames/001.png"), entries[1].file_path);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_index("not-a-timestamp frames/000.png").is_err());
        assert!(parse_index("0.5").is_err());
    }

    #[test]
    fn exhausted_after_the_last_entry() {
        let mut source = ReplaySource::new(Vec::new());
        match source.capture() {
            Err(CaptureError::Exhausted) => (),
            other => panic!("expected Exhausted, got {:?}", other.map(|_| ())),
        }
    }
}
