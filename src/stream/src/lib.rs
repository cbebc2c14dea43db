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

//! Streaming windowed aggregation for frameflow.
//!
//! The entry point is [`executor::SlidingWindowAggExecutor`], which consumes
//! a keyed stream of frame-assigned records interleaved with progress
//! markers and emits per-key window results as the markers complete windows.

pub mod executor;
