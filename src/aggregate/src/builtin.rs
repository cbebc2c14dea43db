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

//! Built-in aggregations. Each one reads its input through a caller-supplied
//! extractor closure, so items stay opaque to the operator.

use std::fmt::Debug;
use std::marker::PhantomData;

use num_traits::{CheckedAdd, CheckedSub, Zero};

use crate::aggregator::Aggregator;
use crate::error::{AggregateError, Result};

/// Checked integer sum. Deductible, so sliding windows maintain it
/// incrementally.
pub struct Sum<T, N, F> {
    extract: F,
    _marker: PhantomData<fn(&T) -> N>,
}

impl<T, N, F> Sum<T, N, F> {
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            _marker: PhantomData,
        }
    }
}

impl<T, N, F> Aggregator for Sum<T, N, F>
where
    T: Send + 'static,
    N: CheckedAdd + CheckedSub + Zero + Copy + PartialEq + Debug + Send + 'static,
    F: Fn(&T) -> N + Send + 'static,
{
    type Acc = N;
    type Item = T;
    type Output = N;

    fn create_accumulator(&self) -> N {
        N::zero()
    }

    fn accumulate(&self, acc: N, item: &T) -> Result<N> {
        acc.checked_add(&(self.extract)(item))
            .ok_or(AggregateError::NumericOutOfRange)
    }

    fn combine(&self, acc: N, other: &N) -> Result<N> {
        acc.checked_add(other)
            .ok_or(AggregateError::NumericOutOfRange)
    }

    fn supports_deduct(&self) -> bool {
        true
    }

    fn deduct(&self, acc: N, other: &N) -> Result<N> {
        acc.checked_sub(other)
            .ok_or(AggregateError::NumericOutOfRange)
    }

    fn finish(&self, acc: &N) -> Result<N> {
        Ok(*acc)
    }
}

/// Item count. Deductible.
pub struct Count<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> Count<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Count<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Aggregator for Count<T> {
    type Acc = u64;
    type Item = T;
    type Output = u64;

    fn create_accumulator(&self) -> u64 {
        0
    }

    fn accumulate(&self, acc: u64, _item: &T) -> Result<u64> {
        acc.checked_add(1).ok_or(AggregateError::NumericOutOfRange)
    }

    fn combine(&self, acc: u64, other: &u64) -> Result<u64> {
        acc.checked_add(*other)
            .ok_or(AggregateError::NumericOutOfRange)
    }

    fn supports_deduct(&self) -> bool {
        true
    }

    fn deduct(&self, acc: u64, other: &u64) -> Result<u64> {
        acc.checked_sub(*other)
            .ok_or(AggregateError::NumericOutOfRange)
    }

    fn finish(&self, acc: &u64) -> Result<u64> {
        Ok(*acc)
    }
}

/// Minimum of the extracted values. No inverse exists for min over a
/// multiset, so sliding windows recompute it from scratch.
pub struct Min<T, V, F> {
    extract: F,
    _marker: PhantomData<fn(&T) -> V>,
}

impl<T, V, F> Min<T, V, F> {
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            _marker: PhantomData,
        }
    }
}

impl<T, V, F> Aggregator for Min<T, V, F>
where
    T: Send + 'static,
    V: Ord + Clone + PartialEq + Debug + Send + 'static,
    F: Fn(&T) -> V + Send + 'static,
{
    type Acc = Option<V>;
    type Item = T;
    type Output = Option<V>;

    fn create_accumulator(&self) -> Option<V> {
        None
    }

    fn accumulate(&self, acc: Option<V>, item: &T) -> Result<Option<V>> {
        let v = (self.extract)(item);
        Ok(Some(match acc {
            Some(cur) => cur.min(v),
            None => v,
        }))
    }

    fn combine(&self, acc: Option<V>, other: &Option<V>) -> Result<Option<V>> {
        Ok(match (acc, other) {
            (Some(a), Some(b)) => Some(a.min(b.clone())),
            (acc, None) => acc,
            (None, Some(b)) => Some(b.clone()),
        })
    }

    fn finish(&self, acc: &Option<V>) -> Result<Option<V>> {
        Ok(acc.clone())
    }
}

/// Maximum of the extracted values. Not deductible, like [`Min`].
pub struct Max<T, V, F> {
    extract: F,
    _marker: PhantomData<fn(&T) -> V>,
}

impl<T, V, F> Max<T, V, F> {
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            _marker: PhantomData,
        }
    }
}

impl<T, V, F> Aggregator for Max<T, V, F>
where
    T: Send + 'static,
    V: Ord + Clone + PartialEq + Debug + Send + 'static,
    F: Fn(&T) -> V + Send + 'static,
{
    type Acc = Option<V>;
    type Item = T;
    type Output = Option<V>;

    fn create_accumulator(&self) -> Option<V> {
        None
    }

    fn accumulate(&self, acc: Option<V>, item: &T) -> Result<Option<V>> {
        let v = (self.extract)(item);
        Ok(Some(match acc {
            Some(cur) => cur.max(v),
            None => v,
        }))
    }

    fn combine(&self, acc: Option<V>, other: &Option<V>) -> Result<Option<V>> {
        Ok(match (acc, other) {
            (Some(a), Some(b)) => Some(a.max(b.clone())),
            (acc, None) => acc,
            (None, Some(b)) => Some(b.clone()),
        })
    }

    fn finish(&self, acc: &Option<V>) -> Result<Option<V>> {
        Ok(acc.clone())
    }
}
