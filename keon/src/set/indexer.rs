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

use super::WIDTH;

/// XOR constant deriving the second candidate row from a key hash.
///
/// Both row constants are fixed primes baked into the snapshot ABI: a table
/// written with one pair of constants is unreadable with any other.
const ROW1_PRIME: u64 = 11400714785074694791;

/// XOR constant deriving the third candidate row from a key hash.
const ROW2_PRIME: u64 = 9650029242287828579;

/// The three candidate bucket rows for one key hash.
///
/// An `Indexer` is transient per-operation state: the key hash plus the base
/// slot offsets of the three rows the hash may legally occupy. Row 0 is
/// addressed by the hash itself, rows 1 and 2 by the hash XOR-folded with
/// fixed primes, each reduced modulo the table depth.
#[derive(Debug, Clone, Copy)]
pub(super) struct Indexer {
    rows: [u64; 3],
    hash: u64,
}

impl Indexer {
    /// Compute the candidate rows for `hash` in a table of `depth` rows.
    ///
    /// `depth` must be non-zero.
    pub(super) fn new(hash: u64, depth: u64) -> Self {
        let mut idx = Indexer {
            rows: [0; 3],
            hash,
        };
        idx.calculate(depth);
        idx
    }

    /// Re-target the indexer at a displaced key hash.
    pub(super) fn rebase(&mut self, hash: u64, depth: u64) {
        self.hash = hash;
        self.calculate(depth);
    }

    fn calculate(&mut self, depth: u64) {
        self.rows[0] = WIDTH * (self.hash % depth);
        self.rows[1] = WIDTH * ((self.hash ^ ROW1_PRIME) % depth);
        self.rows[2] = WIDTH * ((self.hash ^ ROW2_PRIME) % depth);
    }

    /// The key hash this indexer was computed for.
    pub(super) fn hash(&self) -> u64 {
        self.hash
    }

    /// Base slot offsets of the three candidate rows, in scan order.
    pub(super) fn rows(&self) -> [u64; 3] {
        self.rows
    }

    /// Base slot offset of candidate row `i`.
    pub(super) fn row(&self, i: usize) -> u64 {
        self.rows[i]
    }
}
