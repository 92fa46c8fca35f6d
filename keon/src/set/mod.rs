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

//! Cuckoo-style membership set with durable snapshots.
//!
//! A [`Keon`] distributes 64-bit key hashes across alternative bucket rows
//! and rebalances them on demand, which makes it behave like a much more
//! memory-efficient `HashSet<Vec<u8>>` that can be persisted to a single
//! flat file. Unlike a Bloom filter there are no
//! false negatives and removal is supported; like any structure that stores
//! only 64-bit hashes, two keys that collide on the full 64-bit hash are
//! indistinguishable.
//!
//! # Properties
//!
//! - **Fixed capacity**: the maximum key count is declared at construction
//!   and the table never resizes.
//! - **Dense**: slot storage is eight bytes per key plus a small headroom
//!   controlled by the process-wide [`set_density`] tunable.
//! - **No interior locking**: lookups take `&self`, mutations take
//!   `&mut self`. The borrow checker enforces the multiple-reader /
//!   single-writer discipline the structure requires.
//! - **Durable**: a table can be written to a `.keon` snapshot and loaded
//!   back, with an XOR checksum guarding the payload.
//!
//! # Usage
//!
//! ```rust
//! use keon::set::Keon;
//!
//! let mut kn = Keon::new(1000);
//!
//! assert!(kn.insert("apple").is_ok());
//! assert!(kn.insert("banana").is_ok());
//! assert!(kn.insert("apple").is_exist()); // already a member
//!
//! assert!(kn.lookup("apple"));
//! assert!(!kn.lookup("grape"));
//!
//! assert!(kn.remove("apple"));
//! assert!(!kn.lookup("apple"));
//! assert_eq!(kn.len(), 1);
//! ```

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

mod indexer;
mod insert;
mod serialization;
mod table;

pub use self::insert::Insert;
pub use self::serialization::Info;
pub use self::table::Keon;

/// Number of slots per bucket row.
///
/// Fixed by the snapshot ABI together with the candidate-row constants; a
/// table is laid out as `depth` rows of `WIDTH` slots each.
pub const WIDTH: u64 = 3;

/// Default density compaction scaling factor.
///
/// A table reserves `1/density` extra rows of shuffle headroom beyond the
/// declared capacity: density 20 pads 5% (95.0% effective occupancy), 40
/// pads 2.5% (97.5%), 80 pads 1.25% (99.75%). Denser tables spend longer in
/// the shuffle loop on the last few inserts before capacity.
pub const DEFAULT_DENSITY: u64 = 40;

static DENSITY: AtomicU64 = AtomicU64::new(DEFAULT_DENSITY);

/// Set the process-wide density factor used by [`Keon::new`].
///
/// Larger values pack the table tighter at the cost of longer worst-case
/// inserts near capacity. The value is read once per construction; existing
/// tables are unaffected.
///
/// # Panics
///
/// Panics if `density` is 0.
pub fn set_density(density: u64) {
    assert!(density > 0, "density must be greater than 0");
    DENSITY.store(density, Ordering::Relaxed);
}

/// Return the process-wide density factor.
pub fn density() -> u64 {
    DENSITY.load(Ordering::Relaxed)
}
