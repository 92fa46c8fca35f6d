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

use std::collections::HashMap;
use std::mem;

use rand::rngs::SmallRng;
use rand::RngCore;
use rand::SeedableRng;

use crate::hash;

use super::indexer::Indexer;
use super::table::Keon;
use super::WIDTH;

/// Max outer shuffle tracks attempted before giving up.
const SHUFFLE_CYCLES: usize = 500;

/// Max distinct cyclic-tracker entries per track (width * 17 appears ideal).
const SHUFFLE_HISTORY: usize = 50;

/// Outcome of a single [`Keon::insert`] call.
///
/// Exactly one of the three states holds. `Exist` cannot distinguish a
/// re-inserted key from a different key whose 64-bit hash collides with a
/// stored one; callers that must treat that case as a hard failure check
/// [`is_exist`](Self::is_exist) instead of only [`is_ok`](Self::is_ok).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// The key was stored; the set grew by one.
    Ok,
    /// The key hash is already present, so nothing changed.
    Exist,
    /// The table is at capacity, or the shuffle engine ran out of tracks.
    NoSpace,
}

impl Insert {
    /// Whether the key was newly stored.
    pub fn is_ok(self) -> bool {
        self == Insert::Ok
    }

    /// Whether the key hash was already present.
    pub fn is_exist(self) -> bool {
        self == Insert::Exist
    }

    /// Whether the insert was refused for lack of space.
    pub fn is_no_space(self) -> bool {
        self == Insert::NoSpace
    }
}

impl Keon {
    /// Insert `key` into the set.
    ///
    /// The fast path stores the key hash in the first empty slot of its
    /// nine candidates. When all nine are occupied, resident keys are
    /// shuffled to their alternative rows along short randomized
    /// displacement tracks until a slot opens up.
    ///
    /// On [`Insert::NoSpace`] the table is left exactly as it was: the
    /// refused key is absent and every previously stored key is still a
    /// member.
    ///
    /// # Examples
    ///
    /// ```
    /// use keon::set::Keon;
    ///
    /// let mut kn = Keon::new(10);
    /// assert!(kn.insert("one").is_ok());
    /// assert!(kn.insert("one").is_exist());
    /// assert_eq!(kn.len(), 1);
    /// ```
    pub fn insert(&mut self, key: impl AsRef<[u8]>) -> Insert {
        if self.count == self.max {
            return Insert::NoSpace;
        }

        let mut idx = Indexer::new(hash::sum64(key.as_ref()), self.depth);

        // verify not already present in any candidate slot and record the
        // first empty slot while scanning
        let mut empty = None;
        for base in idx.rows() {
            for j in 0..WIDTH {
                let n = (base + j) as usize;
                if self.slots[n] == idx.hash() {
                    return Insert::Exist;
                }
                if self.slots[n] == 0 && empty.is_none() {
                    empty = Some(n);
                }
            }
        }

        if let Some(n) = empty {
            self.slots[n] = idx.hash();
            self.count += 1;
            return Insert::Ok;
        }

        self.shuffle(&mut idx)
    }

    /// Displace resident keys until the carried key finds a slot.
    ///
    /// Runs many short randomized tracks rather than one long deterministic
    /// walk: each track swaps the carried hash into a random candidate slot,
    /// then tries to re-home the displaced occupant in one of its alternate
    /// rows, aborting the track as soon as the cyclic tracker sees the same
    /// (row, key) pair recur or fills up. Short tracks with fast aborts
    /// locate an open slot roughly twice as fast near capacity.
    ///
    /// Every swap is recorded; if all tracks exhaust, the log is unwound in
    /// reverse so the table returns to its exact pre-call state.
    fn shuffle(&mut self, idx: &mut Indexer) -> Insert {
        let inserted = idx.hash();
        let mut rng = SmallRng::from_os_rng();
        let mut swapped: Vec<usize> = Vec::new();
        let mut cyclic: HashMap<(u64, u64), u8> = HashMap::with_capacity(SHUFFLE_HISTORY);

        for _ in 0..SHUFFLE_CYCLES {
            cyclic.clear();

            loop {
                // random candidate row of the carried key, random victim slot
                let random = rng.next_u64();
                let row = idx.row((random % WIDTH) as usize);
                let victim = (row + (random >> 56) % WIDTH) as usize;

                let seen = {
                    let counter = cyclic.entry((row, idx.hash())).or_insert(0);
                    *counter += 1;
                    *counter
                };
                if u64::from(seen) > WIDTH || cyclic.len() == SHUFFLE_HISTORY {
                    // cyclic movement: jump tracks, keeping the carried key
                    break;
                }

                let displaced = mem::replace(&mut self.slots[victim], idx.hash());
                swapped.push(victim);
                idx.rebase(displaced, self.depth);

                // try to re-home the displaced key away from the row it was
                // just evicted from
                for base in idx.rows() {
                    if base == row {
                        continue;
                    }
                    for j in 0..WIDTH {
                        let n = (base + j) as usize;
                        if self.slots[n] == 0 {
                            self.slots[n] = idx.hash();
                            self.count += 1;
                            return Insert::Ok;
                        }
                    }
                }
            }
        }

        // out of tracks: unwind every swap so no resident key is lost and
        // the refused key leaves no trace
        let mut carried = idx.hash();
        for &n in swapped.iter().rev() {
            carried = mem::replace(&mut self.slots[n], carried);
        }
        debug_assert_eq!(carried, inserted);

        log::warn!(
            "shuffle exhausted after {SHUFFLE_CYCLES} tracks at {}/{} keys",
            self.count,
            self.max
        );
        Insert::NoSpace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_then_exist() {
        let mut kn = Keon::with_density(10, 40);

        assert!(kn.insert("apple").is_ok());
        assert!(kn.insert("apple").is_exist());
        assert_eq!(kn.len(), 1);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut kn = Keon::with_density(10, 40);
        for i in 0..10u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok(), "key {i}");
        }
        assert_eq!(kn.len(), kn.cap());
        assert_eq!(kn.ratio(), 100);

        for i in 0..10u32 {
            assert!(kn.lookup(i.to_be_bytes()), "key {i}");
        }
    }

    #[test]
    fn test_insert_at_capacity_is_no_space() {
        let mut kn = Keon::with_density(10, 40);
        for i in 0..10u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok());
        }

        assert!(kn.insert("one more").is_no_space());
        assert_eq!(kn.len(), 10);
        assert!(!kn.lookup("one more"));

        // the refused insert corrupted nothing
        for i in 0..10u32 {
            assert!(kn.lookup(i.to_be_bytes()), "key {i}");
        }
    }

    #[test]
    fn test_remove_then_reinsert_at_capacity() {
        let mut kn = Keon::with_density(10, 40);
        for i in 0..10u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok());
        }

        assert!(kn.insert(3u32.to_be_bytes()).is_exist());
        assert!(kn.remove(3u32.to_be_bytes()));
        assert_eq!(kn.len(), 9);
        assert!(kn.insert(3u32.to_be_bytes()).is_ok());
        assert_eq!(kn.len(), 10);
    }

    #[test]
    fn test_shuffle_under_pressure() {
        // dense enough that inserts must displace residents
        let mut kn = Keon::with_density(3000, 80);
        for i in 0..3000u32 {
            assert!(kn.insert(i.to_be_bytes()).is_ok(), "key {i}");
        }
        assert_eq!(kn.len(), 3000);

        for i in 0..3000u32 {
            assert!(kn.lookup(i.to_be_bytes()), "key {i}");
        }

        let occupied = kn.dump().iter().filter(|&&slot| slot != 0).count();
        assert_eq!(occupied as u64, kn.len());
    }
}
