// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Snapshot I/O for [`Keon`] tables.
//!
//! A snapshot is a single flat `.keon` file: an ASCII header line of four
//! decimals, `"<checksum> <count> <max> <depth>\n"`, followed by exactly
//! `depth * 3` slot values as little-endian unsigned 64-bit integers with no
//! padding and no trailer. The checksum is the XOR of every slot value
//! (empty slots included), so flipping any payload bit is detected on load.
//!
//! The payload stores raw key hashes, which makes the key hash function and
//! the candidate-row constants part of the format: snapshots only round-trip
//! between implementations that share both.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use byteorder::ByteOrder;
use byteorder::WriteBytesExt;
use byteorder::LE;

use crate::error::Error;

use super::table::sized_depth;
use super::table::Keon;
use super::WIDTH;

/// File stem used when no snapshot path was ever given.
const DEFAULT_NAME: &str = "keon";

/// Snapshot file extension, appended whenever a path lacks it.
const EXTENSION: &str = ".keon";

/// Header fields of a snapshot file, as reported by [`Keon::info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Info {
    /// XOR checksum stored in the header.
    pub checksum: u64,
    /// Number of keys the snapshot claims to hold.
    pub count: u64,
    /// Declared maximum key count.
    pub max: u64,
    /// Number of bucket rows in the payload.
    pub depth: u64,
    /// Whether the header was read intact and describes a populated table
    /// (non-zero checksum and max).
    pub ok: bool,
}

impl Keon {
    /// Write the table to a snapshot at `path`.
    ///
    /// The `.keon` extension is appended when missing, and the normalized
    /// path is remembered so a later [`save`](Self::save) rewrites the same
    /// file.
    ///
    /// # Errors
    ///
    /// Surfaces any underlying file creation or write failure.
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.path = path.as_ref().to_path_buf();
        self.save()
    }

    /// Write the table to the path remembered from a prior
    /// [`write`](Self::write) or [`load`](Self::load).
    ///
    /// Falls back to `keon.keon` in the current directory when the table
    /// has never been given a path. The file is flushed and synced before
    /// returning.
    ///
    /// # Errors
    ///
    /// Surfaces any underlying file creation or write failure.
    pub fn save(&mut self) -> Result<(), Error> {
        self.path = normalized(&self.path);
        log::trace!("writing snapshot to {:?}", self.path);

        let file = File::create(&self.path)?;
        let mut buf = BufWriter::new(file);

        writeln!(
            buf,
            "{} {} {} {}",
            self.checksum(),
            self.count,
            self.max,
            self.depth
        )?;
        for &slot in &self.slots {
            buf.write_u64::<LE>(slot)?;
        }

        buf.flush()?;
        buf.get_ref().sync_all()?;
        Ok(())
    }

    /// Load a table from the snapshot at `path` (extension normalized).
    ///
    /// Returns the table together with a validity flag. The flag is `false`
    /// when the payload checksum does not match the header, when the
    /// payload is not exactly `depth * 3` slots, or when the header's depth
    /// disagrees with re-running the sizer on the stored `max` at the
    /// current density. An invalid table is still returned so it can be
    /// inspected, but its contents are untrusted.
    ///
    /// # Errors
    ///
    /// Surfaces open and read failures, and malformed headers that leave
    /// nothing to inspect.
    pub fn load(path: impl AsRef<Path>) -> Result<(Keon, bool), Error> {
        let path = normalized(path.as_ref());
        let file = File::open(&path)?;
        let mut buf = BufReader::new(file);

        let mut line = String::new();
        buf.read_line(&mut line)?;
        let [checksum, count, max, depth] = parse_header(&line)?;

        let slots = depth
            .checked_mul(WIDTH)
            .and_then(|n| n.checked_mul(8).map(|_| n))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::bad_header("depth", depth))?;
        let mut table = Keon {
            path,
            count,
            max,
            depth,
            slots: vec![0; slots],
        };

        // a trailing chunk shorter than one slot is discarded, then caught
        // by the exact-length rule below
        let mut payload = Vec::with_capacity(slots.saturating_mul(8));
        buf.read_to_end(&mut payload)?;
        for (slot, chunk) in table.slots.iter_mut().zip(payload.chunks_exact(8)) {
            *slot = LE::read_u64(chunk);
        }

        let ok = payload.len() as u64 == slots as u64 * 8
            && table.depth == sized_depth(table.max, super::density())
            && table.checksum() == checksum;
        if !ok {
            log::warn!("snapshot {:?} failed validation", table.path);
        }

        Ok((table, ok))
    }

    /// Read and report the header of the snapshot at `path` without
    /// touching the payload.
    ///
    /// Never fails: any open or parse problem is reported as `ok == false`
    /// on the returned [`Info`]. The path is used as given.
    pub fn info(path: impl AsRef<Path>) -> Info {
        let result = Info::default();

        let Ok(file) = File::open(path.as_ref()) else {
            return result;
        };
        let mut line = String::new();
        if BufReader::new(file).read_line(&mut line).is_err() {
            return result;
        }
        let Ok([checksum, count, max, depth]) = parse_header(&line) else {
            return result;
        };

        Info {
            checksum,
            count,
            max,
            depth,
            ok: checksum > 0 && max > 0,
        }
    }

    /// XOR fold of every slot value, empty slots included.
    pub(super) fn checksum(&self) -> u64 {
        self.slots.iter().fold(0, |checksum, &slot| checksum ^ slot)
    }
}

/// Normalize a snapshot path: default the file name, append the extension.
fn normalized(path: &Path) -> PathBuf {
    let mut path = if path.as_os_str().is_empty() {
        PathBuf::from(DEFAULT_NAME)
    } else {
        path.to_path_buf()
    };
    if !path.as_os_str().to_string_lossy().ends_with(EXTENSION) {
        let mut os = path.into_os_string();
        os.push(EXTENSION);
        path = PathBuf::from(os);
    }
    path
}

/// Parse the four space-separated header decimals.
fn parse_header(line: &str) -> Result<[u64; 4], Error> {
    const FIELDS: [&str; 4] = ["checksum", "count", "max", "depth"];

    let mut values = [0u64; 4];
    let mut tokens = line.split_whitespace();
    for (value, field) in values.iter_mut().zip(FIELDS) {
        let token = tokens
            .next()
            .ok_or_else(|| Error::bad_header(field, "missing"))?;
        *value = token
            .parse()
            .map_err(|_| Error::bad_header(field, token))?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::error::ErrorKind;

    use super::*;

    #[test]
    fn test_normalized_paths() {
        assert_eq!(normalized(Path::new("")), PathBuf::from("keon.keon"));
        assert_eq!(normalized(Path::new("snap")), PathBuf::from("snap.keon"));
        assert_eq!(
            normalized(Path::new("snap.keon")),
            PathBuf::from("snap.keon")
        );
        assert_eq!(
            normalized(Path::new("dir/snap.db")),
            PathBuf::from("dir/snap.db.keon")
        );
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(parse_header("1 2 3 4\n").unwrap(), [1, 2, 3, 4]);
        assert_eq!(
            parse_header("18446744073709551615 0 1000000 341667\n").unwrap(),
            [u64::MAX, 0, 1_000_000, 341_667]
        );
        assert!(parse_header("1 2 3\n").is_err());
        assert!(parse_header("a b c d\n").is_err());
        assert!(parse_header("").is_err());
    }

    #[test]
    fn test_checksum_folds_all_slots() {
        let mut kn = Keon::with_density(10, 40);
        assert_eq!(kn.checksum(), 0);

        kn.insert("apple");
        kn.insert("banana");
        let expected = kn
            .dump()
            .iter()
            .fold(0u64, |checksum, &slot| checksum ^ slot);
        assert_eq!(kn.checksum(), expected);
        assert_ne!(kn.checksum(), 0);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.keon");

        let mut kn = Keon::with_density(500, 40);
        for i in 0..500u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok());
        }
        kn.write(&path).unwrap();

        let (loaded, ok) = Keon::load(&path).unwrap();
        assert!(ok);
        assert_eq!(loaded.len(), kn.len());
        assert_eq!(loaded.cap(), kn.cap());
        assert_eq!(loaded.dump(), kn.dump());
        for i in 0..500u32 {
            assert!(loaded.lookup(i.to_be_bytes()), "key {i}");
        }
    }

    #[test]
    fn test_write_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap");

        let mut kn = Keon::with_density(10, 40);
        kn.insert("apple");
        kn.write(&path).unwrap();

        assert!(!path.exists());
        assert!(dir.path().join("snap.keon").exists());
    }

    #[test]
    fn test_save_reuses_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reuse.keon");

        let mut kn = Keon::with_density(10, 40);
        kn.insert("apple");
        kn.write(&path).unwrap();

        let (mut loaded, ok) = Keon::load(&path).unwrap();
        assert!(ok);
        loaded.insert("banana");
        loaded.save().unwrap();

        let (again, ok) = Keon::load(&path).unwrap();
        assert!(ok);
        assert!(again.lookup("apple"));
        assert!(again.lookup("banana"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Keon::load(dir.path().join("absent.keon")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_load_garbage_header_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.keon");
        fs::write(&path, b"not a snapshot\n").unwrap();

        let err = Keon::load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_load_detects_flipped_payload_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flip.keon");

        let mut kn = Keon::with_density(100, 40);
        for i in 0..100u32 {
            kn.insert(i.to_be_bytes());
        }
        kn.write(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let header_end = bytes.iter().position(|&b| b == b'\n').unwrap() + 1;
        bytes[header_end + 16] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let (_, ok) = Keon::load(&path).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_load_detects_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.keon");

        let mut kn = Keon::with_density(100, 40);
        kn.insert("apple");
        kn.write(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        let (_, ok) = Keon::load(&path).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_load_detects_trailing_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.keon");

        let mut kn = Keon::with_density(100, 40);
        kn.insert("apple");
        kn.write(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&[0u8; 8]);
        fs::write(&path, &bytes).unwrap();

        let (_, ok) = Keon::load(&path).unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_load_empty_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.keon");

        let mut kn = Keon::with_density(10, 40);
        kn.write(&path).unwrap();

        let (loaded, ok) = Keon::load(&path).unwrap();
        assert!(ok);
        assert!(loaded.is_empty());

        // info refuses an all-zero checksum, by design
        assert!(!Keon::info(&path).ok);
    }

    #[test]
    fn test_info_reports_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.keon");

        let mut kn = Keon::with_density(100, 40);
        for i in 0..42u32 {
            kn.insert(i.to_be_bytes());
        }
        kn.write(&path).unwrap();

        let info = Keon::info(&path);
        assert!(info.ok);
        assert_eq!(info.count, 42);
        assert_eq!(info.max, 100);
        assert_eq!(info.depth, kn.dump().len() as u64 / WIDTH);
        assert_ne!(info.checksum, 0);
    }

    #[test]
    fn test_info_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let info = Keon::info(dir.path().join("absent.keon"));
        assert!(!info.ok);
        assert_eq!(info, Info::default());
    }
}
