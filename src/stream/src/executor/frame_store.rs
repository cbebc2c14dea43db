// Copyright 2024 Frameflow Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use frameflow_aggregate::Aggregator;

use super::StreamExecutorResult;

/// Per-frame keyed accumulator storage: `frame_seq -> (key -> accumulator)`.
///
/// A frame's key map is created lazily on the first record for that frame and
/// removed whole when the frame passes out of the window. Frame sequences are
/// preserved as produced upstream; the store never inspects alignment.
pub struct FrameStore<K, A> {
    frames: BTreeMap<i64, HashMap<K, A>>,
}

impl<K, A> Default for FrameStore<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, A> FrameStore<K, A> {
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }
}

impl<K, A> FrameStore<K, A>
where
    K: Hash + Eq,
{
    /// Folds one record into the accumulator for `(frame_seq, key)`, creating
    /// the frame's key map and the accumulator as needed.
    pub fn upsert<Agg>(
        &mut self,
        frame_seq: i64,
        key: K,
        record: &Agg::Item,
        agg: &Agg,
    ) -> StreamExecutorResult<()>
    where
        Agg: Aggregator<Acc = A>,
    {
        let key_map = self.frames.entry(frame_seq).or_default();
        let acc = match key_map.remove(&key) {
            Some(acc) => acc,
            None => agg.create_accumulator(),
        };
        key_map.insert(key, agg.accumulate(acc, record)?);
        Ok(())
    }

    pub fn get(&self, frame_seq: i64) -> Option<&HashMap<K, A>> {
        self.frames.get(&frame_seq)
    }

    /// Removes and returns the frame's key map.
    pub fn evict(&mut self, frame_seq: i64) -> Option<HashMap<K, A>> {
        self.frames.remove(&frame_seq)
    }

    /// The smallest stored frame sequence.
    pub fn min_frame_seq(&self) -> Option<i64> {
        self.frames.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn contains_frame(&self, frame_seq: i64) -> bool {
        self.frames.contains_key(&frame_seq)
    }
}

#[cfg(test)]
mod tests {
    use frameflow_aggregate::Sum;

    use super::*;

    #[test]
    fn test_upsert_get_evict() {
        let sum = Sum::new(|v: &i64| *v);
        let mut store = FrameStore::new();
        assert!(store.is_empty());
        assert_eq!(store.min_frame_seq(), None);

        store.upsert(20, "a", &1, &sum).unwrap();
        store.upsert(20, "a", &2, &sum).unwrap();
        store.upsert(20, "b", &5, &sum).unwrap();
        store.upsert(10, "a", &7, &sum).unwrap();

        assert_eq!(store.min_frame_seq(), Some(10));
        assert_eq!(store.frame_count(), 2);
        assert_eq!(store.get(20).unwrap()[&"a"], 3);
        assert_eq!(store.get(20).unwrap()[&"b"], 5);
        assert_eq!(store.get(30), None);

        let evicted = store.evict(10).unwrap();
        assert_eq!(evicted[&"a"], 7);
        assert_eq!(store.evict(10), None);
        assert!(!store.contains_frame(10));
        assert_eq!(store.min_frame_seq(), Some(20));
    }
}
