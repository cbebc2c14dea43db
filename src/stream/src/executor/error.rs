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

use frameflow_aggregate::AggregateError;
use thiserror::Error;

pub type StreamExecutorResult<T> = std::result::Result<T, StreamExecutorError>;

/// The error type for streaming executors. Executors are deterministic and
/// recover nothing locally: an error terminates the output stream.
#[derive(Error, Debug)]
pub enum StreamExecutorError {
    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

static_assertions::assert_impl_all!(StreamExecutorError: Send, Sync);
