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

use std::collections::HashMap;
use std::hash::Hash;

use frameflow_aggregate::{Aggregator, Result as AggregateResult};

use super::StreamExecutorResult;

/// The running per-key accumulator over the currently emitted window, used
/// when the aggregation supplies a deduction operator.
///
/// After the window ending at frame `f` has been emitted and completed, this
/// equals the per-key combine of the frames still inside the window. Entries
/// whose accumulator equals the captured empty accumulator are removed, so
/// the state's size stays proportional to the keys live in the window.
pub struct SlidingWindowState<K, A> {
    accs: HashMap<K, A>,
    empty_acc: A,
}

impl<K, A> SlidingWindowState<K, A>
where
    K: Hash + Eq + Clone,
    A: Clone + PartialEq,
{
    pub fn new(empty_acc: A) -> Self {
        Self {
            accs: HashMap::new(),
            empty_acc,
        }
    }

    /// Folds a leading-edge frame into the running state. A missing frame is
    /// a no-op.
    pub fn merge_frame<Agg>(
        &mut self,
        agg: &Agg,
        frame: Option<&HashMap<K, A>>,
    ) -> StreamExecutorResult<()>
    where
        Agg: Aggregator<Acc = A>,
    {
        self.patch(frame, |acc, v| agg.combine(acc, v))
    }

    /// Retracts an evicted trailing-edge frame from the running state. A
    /// missing frame is a no-op.
    pub fn retract_frame<Agg>(
        &mut self,
        agg: &Agg,
        frame: Option<&HashMap<K, A>>,
    ) -> StreamExecutorResult<()>
    where
        Agg: Aggregator<Acc = A>,
    {
        self.patch(frame, |acc, v| agg.deduct(acc, v))
    }

    fn patch(
        &mut self,
        frame: Option<&HashMap<K, A>>,
        op: impl Fn(A, &A) -> AggregateResult<A>,
    ) -> StreamExecutorResult<()> {
        let Some(frame) = frame else {
            return Ok(());
        };
        for (key, v) in frame {
            let acc = match self.accs.remove(key) {
                Some(acc) => acc,
                None => self.empty_acc.clone(),
            };
            let acc = op(acc, v)?;
            if acc != self.empty_acc {
                self.accs.insert(key.clone(), acc);
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &A)> {
        self.accs.iter()
    }

    pub fn get(&self, key: &K) -> Option<&A> {
        self.accs.get(key)
    }

    pub fn len(&self) -> usize {
        self.accs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accs.is_empty()
    }
}
