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

use xxhash_rust::xxh64::xxh64;

/// The key hash is XXH64 with seed 0 over the raw key bytes.
///
/// The hash function is a compatibility parameter of the `.keon` snapshot
/// format: the file stores raw 64-bit key hashes, so two processes can only
/// share snapshots when they hash keys identically. Changing the function or
/// the seed silently invalidates every snapshot ever written, which is why
/// both are pinned here rather than configurable. A key whose hash happens
/// to be exactly 0 is indistinguishable from an empty slot and cannot be
/// stored; with XXH64 the chance of that is negligible in practice.
pub(crate) const KEY_HASH_SEED: u64 = 0;

/// Hash a key into its stored 64-bit form.
#[inline]
pub(crate) fn sum64(key: &[u8]) -> u64 {
    xxh64(key, KEY_HASH_SEED)
}
