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

//! Test utilities for driving executors with scripted inputs.

use futures::StreamExt;

use super::{BoxedMessageStream, Message, ProgressMarker};

/// A source executor whose message sequence is scripted up front. The
/// resulting stream ends after the last pushed message.
pub struct MockSource<D> {
    msgs: Vec<Message<D>>,
}

impl<D> Default for MockSource<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> MockSource<D> {
    pub fn new() -> Self {
        Self { msgs: Vec::new() }
    }
}

impl<D: Send + 'static> MockSource<D> {
    pub fn push_record(&mut self, record: D) {
        self.msgs.push(Message::Record(record));
    }

    pub fn push_records(&mut self, records: impl IntoIterator<Item = D>) {
        for record in records {
            self.push_record(record);
        }
    }

    pub fn push_progress(&mut self, seq: i64) {
        self.msgs.push(Message::Progress(ProgressMarker::new(seq)));
    }

    pub fn into_stream(self) -> BoxedMessageStream<D> {
        futures::stream::iter(self.msgs.into_iter().map(Ok)).boxed()
    }
}
