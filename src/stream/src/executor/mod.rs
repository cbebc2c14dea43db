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

use enum_as_inner::EnumAsInner;
use futures::stream::BoxStream;

mod error;
mod frame_store;
pub mod monitor;
mod sliding_window;
pub mod test_utils;
mod window_agg;

pub use error::{StreamExecutorError, StreamExecutorResult};
pub use frame_store::FrameStore;
pub use sliding_window::SlidingWindowState;
pub use window_agg::{SlidingWindowAggArgs, SlidingWindowAggExecutor};

pub type MessageStreamItem<D> = StreamExecutorResult<Message<D>>;
pub type BoxedMessageStream<D> = BoxStream<'static, MessageStreamItem<D>>;

/// Extracts the frame sequence a record was assigned to upstream.
pub type FrameSeqExtractor<T> = Box<dyn Fn(&T) -> i64 + Send + Sync>;
/// Extracts the grouping key of a record.
pub type KeyExtractor<T, K> = Box<dyn Fn(&T) -> K + Send + Sync>;

/// An in-band signal that no further record with a frame sequence at or
/// below `seq` will arrive. Authorizes emission of completed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressMarker {
    pub seq: i64,
}

impl ProgressMarker {
    pub fn new(seq: i64) -> Self {
        Self { seq }
    }
}

/// One window result row: the aggregated value for `key` in the window that
/// ends with frame `frame_seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord<K, R> {
    pub frame_seq: i64,
    pub key: K,
    pub value: R,
}

/// The unit of an executor's input and output streams: data records
/// interleaved with progress markers.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Message<D> {
    Record(D),
    Progress(ProgressMarker),
}

impl<D> From<ProgressMarker> for Message<D> {
    fn from(marker: ProgressMarker) -> Self {
        Message::Progress(marker)
    }
}
