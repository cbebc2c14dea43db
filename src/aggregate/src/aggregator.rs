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

use std::fmt::Debug;

use crate::error::{AggregateError, Result};

/// The bundle of operations a windowing operator needs to fold items of type
/// [`Item`](Self::Item) into per-key accumulators of type [`Acc`](Self::Acc)
/// and derive results of type [`Output`](Self::Output).
///
/// # Contract
///
/// - [`create_accumulator`](Self::create_accumulator) must be deterministic:
///   every call returns a value equal (by `PartialEq`) to every other call's
///   result for the lifetime of the operator. Operators capture one such
///   "empty" accumulator at construction and treat any accumulator equal to
///   it as absence.
/// - [`combine`](Self::combine) must be associative and commutative over
///   accumulators of non-empty frames.
/// - When [`supports_deduct`](Self::supports_deduct) returns `true`,
///   [`deduct`](Self::deduct) must be a true inverse of `combine`:
///   `deduct(combine(x, y), y) == x` by value equality. Operators use it to
///   retract a window's trailing frame instead of recomputing the window
///   from scratch.
/// - [`finish`](Self::finish) must be pure.
pub trait Aggregator: Send + 'static {
    type Item: Send + 'static;
    type Acc: Clone + PartialEq + Debug + Send + 'static;
    type Output: Send + 'static;

    /// Returns a fresh, empty accumulator.
    fn create_accumulator(&self) -> Self::Acc;

    /// Folds one item into the accumulator. Takes the accumulator by value
    /// and returns the new one; the caller must use only the returned value.
    fn accumulate(&self, acc: Self::Acc, item: &Self::Item) -> Result<Self::Acc>;

    /// Merges another accumulator into `acc`.
    fn combine(&self, acc: Self::Acc, other: &Self::Acc) -> Result<Self::Acc>;

    /// Whether [`deduct`](Self::deduct) is available. Captured once by the
    /// operator; must not change over the aggregator's lifetime.
    fn supports_deduct(&self) -> bool {
        false
    }

    /// Removes a previously combined accumulator from `acc`. The inverse of
    /// [`combine`](Self::combine); only called when
    /// [`supports_deduct`](Self::supports_deduct) returns `true`.
    fn deduct(&self, _acc: Self::Acc, _other: &Self::Acc) -> Result<Self::Acc> {
        Err(AggregateError::DeductUnsupported)
    }

    /// Derives the externally visible result from an accumulator.
    fn finish(&self, acc: &Self::Acc) -> Result<Self::Output>;
}
