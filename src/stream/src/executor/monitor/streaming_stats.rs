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

use prometheus::{register_int_counter_with_registry, IntCounter, Registry};

#[derive(Clone)]
pub struct StreamingMetrics {
    /// Records folded into frame accumulators.
    pub records_applied: IntCounter,
    /// Window result rows emitted downstream.
    pub windowed_rows_emitted: IntCounter,
    /// Windows completed and evicted, including empty ones.
    pub windows_emitted: IntCounter,
    /// Records dropped because their frame was already emitted.
    pub late_records_dropped: IntCounter,
}

impl StreamingMetrics {
    pub fn new(registry: &Registry) -> Self {
        let records_applied = register_int_counter_with_registry!(
            "stream_window_records_applied",
            "Records folded into frame accumulators",
            registry
        )
        .unwrap();

        let windowed_rows_emitted = register_int_counter_with_registry!(
            "stream_window_rows_emitted",
            "Window result rows emitted downstream",
            registry
        )
        .unwrap();

        let windows_emitted = register_int_counter_with_registry!(
            "stream_windows_emitted",
            "Windows completed and evicted, including empty ones",
            registry
        )
        .unwrap();

        let late_records_dropped = register_int_counter_with_registry!(
            "stream_window_late_records_dropped",
            "Records dropped because their frame was already emitted",
            registry
        )
        .unwrap();

        Self {
            records_applied,
            windowed_rows_emitted,
            windows_emitted,
            late_records_dropped,
        }
    }

    /// Creates a metrics instance backed by a throwaway registry, for tests.
    pub fn unused() -> Self {
        Self::new(&Registry::new())
    }
}
