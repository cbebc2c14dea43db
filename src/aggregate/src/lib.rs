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

//! Aggregation primitives shared by frameflow operators: the [`Aggregator`]
//! operation bundle, a few built-in aggregations, and the [`WindowDefinition`]
//! value describing frame and window lengths.

mod aggregator;
mod builtin;
mod error;
mod window;

pub use aggregator::Aggregator;
pub use builtin::{Count, Max, Min, Sum};
pub use error::{AggregateError, Result};
pub use window::WindowDefinition;
