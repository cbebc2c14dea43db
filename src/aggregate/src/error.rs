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

use thiserror::Error;

/// A specialized Result type for aggregation operations.
pub type Result<T, E = AggregateError> = std::result::Result<T, E>;

/// The error type for aggregation operations.
#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam {
        name: &'static str,
        reason: Box<str>,
    },

    #[error("Deduction is not supported by this aggregation")]
    DeductUnsupported,

    #[error("Numeric out of range")]
    NumericOutOfRange,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

static_assertions::assert_impl_all!(AggregateError: Send, Sync);
