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

use std::path::PathBuf;

use crate::hash;

use super::indexer::Indexer;
use super::WIDTH;

/// A fixed-capacity membership set over 64-bit key hashes.
///
/// The table is a flat array of `depth * 3` slots, each holding one key
/// hash or 0 for empty. Every key has three candidate rows of three slots;
/// [`lookup`](Self::lookup) scans at most those nine slots, and
/// [`insert`](Self::insert) shuffles resident keys between their alternative
/// rows when all nine are taken.
///
/// Readers borrow the table shared, writers exclusively; this is the whole
/// concurrency contract. A `&Keon` may be handed to any number of threads at
/// once, but no lookups can coexist with an insert or remove.
///
/// # Examples
///
/// ```
/// use keon::set::Keon;
///
/// let mut kn = Keon::new(100);
/// assert!(kn.insert(b"one".as_slice()).is_ok());
/// assert!(kn.lookup(b"one".as_slice()));
/// assert_eq!(kn.len(), 1);
/// assert_eq!(kn.cap(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct Keon {
    /// Snapshot path remembered from a prior write or load.
    pub(super) path: PathBuf,
    /// Number of occupied slots.
    pub(super) count: u64,
    /// Declared maximum key count.
    pub(super) max: u64,
    /// Number of bucket rows; always a multiple of the row width.
    pub(super) depth: u64,
    /// Flat slot array of `depth * WIDTH` key hashes, 0 meaning empty.
    pub(super) slots: Vec<u64>,
}

impl Keon {
    /// Construct an empty table sized for up to `max` keys.
    ///
    /// Reads the process-wide [density](super::set_density) factor to decide
    /// how much shuffle headroom to reserve beyond `max`.
    pub fn new(max: u64) -> Self {
        Self::with_density(max, super::density())
    }

    /// Construct an empty table with an explicit density factor.
    ///
    /// # Panics
    ///
    /// Panics if `density` is 0.
    pub fn with_density(max: u64, density: u64) -> Self {
        assert!(density > 0, "density must be greater than 0");
        let depth = sized_depth(max, density);
        Keon {
            path: PathBuf::new(),
            count: 0,
            max,
            depth,
            slots: vec![0; (depth * WIDTH) as usize],
        }
    }

    /// Test whether `key` is a member of the set.
    ///
    /// Scans the nine candidate slots for the key's hash; no side effects.
    pub fn lookup(&self, key: impl AsRef<[u8]>) -> bool {
        if self.depth == 0 {
            return false;
        }

        let idx = Indexer::new(hash::sum64(key.as_ref()), self.depth);
        for base in idx.rows() {
            for j in 0..WIDTH {
                if self.slots[(base + j) as usize] == idx.hash() {
                    return true;
                }
            }
        }

        false
    }

    /// Remove `key` from the set.
    ///
    /// Returns `true` when the key was present and has been removed, `false`
    /// when it was absent. Removal shifts the remainder of the matched row
    /// left so occupied slots stay packed at the front of each row.
    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> bool {
        if self.depth == 0 {
            return false;
        }

        let idx = Indexer::new(hash::sum64(key.as_ref()), self.depth);
        for base in idx.rows() {
            for j in 0..WIDTH {
                let n = (base + j) as usize;
                if self.slots[n] == idx.hash() {
                    // shift the rest of the row left and wipe the tail
                    for k in j..WIDTH - 1 {
                        self.slots[(base + k) as usize] = self.slots[(base + k + 1) as usize];
                    }
                    self.slots[(base + WIDTH - 1) as usize] = 0;
                    self.count -= 1;
                    return true;
                }
            }
        }

        false
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Declared maximum key count.
    pub fn cap(&self) -> u64 {
        self.max
    }

    /// Fill ratio as an integer percentage of capacity, 0 for an empty-max
    /// table.
    pub fn ratio(&self) -> u64 {
        if self.max == 0 {
            return 0;
        }
        self.count * 100 / self.max
    }

    /// Ordered copy of the raw slot array, for debugging and introspection.
    ///
    /// The result has length `depth * 3`; every chunk of three consecutive
    /// values is one bucket row. No key material can be recovered from it,
    /// only the stored 64-bit hashes.
    pub fn dump(&self) -> Vec<u64> {
        self.slots.clone()
    }
}

/// Compute the row count for `max` keys at the given density.
///
/// Integer row demand plus `1/density` headroom, then bumped until the slot
/// array covers `max` and the row count is a multiple of the row width.
pub(super) fn sized_depth(max: u64, density: u64) -> u64 {
    let mut depth = max / WIDTH;
    depth += depth / density;
    while depth * WIDTH < max || depth % WIDTH != 0 {
        depth += 1;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sized_depth() {
        // 1000/3 = 333 rows, +333/40 = 8 pad rows, bumped to the next
        // multiple of 3
        assert_eq!(sized_depth(1000, 40), 342);
        assert_eq!(sized_depth(10, 40), 6);
        assert_eq!(sized_depth(1, 40), 3);
        assert_eq!(sized_depth(0, 40), 0);
    }

    #[test]
    fn test_sized_depth_invariants() {
        for max in 0..500 {
            for density in [1, 20, 40, 80] {
                let depth = sized_depth(max, density);
                assert!(depth * WIDTH >= max, "max {max} density {density}");
                assert_eq!(depth % WIDTH, 0, "max {max} density {density}");
            }
        }
    }

    #[test]
    fn test_new_table_is_empty() {
        let kn = Keon::with_density(1000, 40);
        assert_eq!(kn.len(), 0);
        assert!(kn.is_empty());
        assert_eq!(kn.cap(), 1000);
        assert_eq!(kn.ratio(), 0);
        assert_eq!(kn.dump().len(), 342 * WIDTH as usize);
        assert!(kn.dump().iter().all(|&slot| slot == 0));
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut kn = Keon::with_density(100, 40);

        assert!(!kn.lookup("apple"));
        assert!(kn.insert("apple").is_ok());
        assert!(kn.lookup("apple"));

        assert!(kn.remove("apple"));
        assert!(!kn.lookup("apple"));
        assert_eq!(kn.len(), 0);

        // removing again is a no-op
        assert!(!kn.remove("apple"));
        assert_eq!(kn.len(), 0);
    }

    #[test]
    fn test_remove_packs_rows() {
        let mut kn = Keon::with_density(100, 40);
        for i in 0..50u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok());
        }
        for i in 0..50u32 {
            assert!(kn.remove(i.to_be_bytes()), "key {i}");
        }

        assert!(kn.is_empty());
        assert!(kn.dump().iter().all(|&slot| slot == 0));
    }

    #[test]
    fn test_len_matches_occupied_slots() {
        let mut kn = Keon::with_density(200, 40);
        for i in 0..150u32 {
            kn.insert(i.to_be_bytes());
        }
        for i in 0..40u32 {
            kn.remove((i * 3).to_be_bytes());
        }

        let occupied = kn.dump().iter().filter(|&&slot| slot != 0).count();
        assert_eq!(kn.len(), occupied as u64);
    }

    #[test]
    fn test_ratio() {
        let mut kn = Keon::with_density(10, 40);
        for i in 0..5u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok());
        }
        assert_eq!(kn.ratio(), 50);
    }

    #[test]
    fn test_zero_capacity_table() {
        let mut kn = Keon::with_density(0, 40);
        assert_eq!(kn.cap(), 0);
        assert_eq!(kn.ratio(), 0);
        assert!(!kn.lookup("anything"));
        assert!(!kn.remove("anything"));
        assert!(kn.insert("anything").is_no_space());
        assert_eq!(kn.len(), 0);
    }
}
