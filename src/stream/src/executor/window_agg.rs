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
use std::sync::Arc;

use async_stream::try_stream;
use frameflow_aggregate::{Aggregator, WindowDefinition};
use futures::{pin_mut, Stream, StreamExt};

use super::monitor::StreamingMetrics;
use super::{
    BoxedMessageStream, FrameRecord, FrameSeqExtractor, FrameStore, KeyExtractor, Message,
    MessageStreamItem, SlidingWindowState, StreamExecutorResult,
};

/// Construction arguments for [`SlidingWindowAggExecutor`].
pub struct SlidingWindowAggArgs<K, Agg: Aggregator> {
    pub window: WindowDefinition,
    pub agg: Agg,
    pub frame_seq_extractor: FrameSeqExtractor<Agg::Item>,
    pub key_extractor: KeyExtractor<Agg::Item, K>,
    pub executor_id: u64,
    pub metrics: Arc<StreamingMetrics>,
}

/// [`SlidingWindowAggExecutor`] aggregates a keyed record stream over
/// fixed-length frames and emits one result row per key for every window of
/// frames a progress marker completes. It works as follows:
///
/// * Records are folded into per-frame, per-key accumulators as they arrive.
/// * Upon a progress marker, every frame up to the marker's grid position
///   that has not been emitted yet is turned into a window: for tumbling
///   windows the frame's own accumulators, for sliding windows either the
///   running state maintained by combine-leading/deduct-trailing (when the
///   aggregation supplies a deduction operator) or a from-scratch fold of
///   the frames in the window.
/// * After a frame's rows have been consumed downstream, the frame that
///   slid out of the window is evicted, and in incremental mode deducted
///   from the running state. The marker is forwarded after all rows it
///   completed.
pub struct SlidingWindowAggExecutor<K, Agg: Aggregator> {
    input: BoxedMessageStream<Agg::Item>,
    inner: ExecutorInner<K, Agg>,
}

struct ExecutorInner<K, Agg: Aggregator> {
    window: WindowDefinition,
    agg: Agg,
    frame_seq_extractor: FrameSeqExtractor<Agg::Item>,
    key_extractor: KeyExtractor<Agg::Item, K>,

    /// Captured once at construction; every emptiness check is value
    /// equality against this accumulator.
    empty_acc: Agg::Acc,

    /// Whether sliding windows are maintained incrementally. Requires a
    /// deduction operator and a non-tumbling window.
    incremental: bool,

    identity: String,
    metrics: Arc<StreamingMetrics>,
}

struct ExecutionVars<K, A> {
    frame_store: FrameStore<K, A>,
    sliding_state: SlidingWindowState<K, A>,

    /// Lazily initialized on the first progress marker that finds a nonempty
    /// frame store. Strictly non-decreasing afterwards.
    next_frame_seq_to_emit: Option<i64>,
}

impl<K, A> ExecutionVars<K, A>
where
    K: Hash + Eq + Clone,
    A: Clone + PartialEq,
{
    fn new(empty_acc: A) -> Self {
        Self {
            frame_store: FrameStore::new(),
            sliding_state: SlidingWindowState::new(empty_acc),
            next_frame_seq_to_emit: None,
        }
    }
}

impl<K, Agg> SlidingWindowAggExecutor<K, Agg>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    Agg: Aggregator + Sync,
    Agg::Acc: Sync,
{
    pub fn new(args: SlidingWindowAggArgs<K, Agg>, input: BoxedMessageStream<Agg::Item>) -> Self {
        let empty_acc = args.agg.create_accumulator();
        let incremental = !args.window.is_tumbling() && args.agg.supports_deduct();
        Self {
            input,
            inner: ExecutorInner {
                window: args.window,
                agg: args.agg,
                frame_seq_extractor: args.frame_seq_extractor,
                key_extractor: args.key_extractor,
                empty_acc,
                incremental,
                identity: format!("SlidingWindowAggExecutor {:X}", args.executor_id),
                metrics: args.metrics,
            },
        }
    }

    pub fn identity(&self) -> &str {
        &self.inner.identity
    }

    pub fn execute(self) -> BoxedMessageStream<FrameRecord<K, Agg::Output>> {
        self.execute_inner().boxed()
    }

    fn apply_record(
        this: &ExecutorInner<K, Agg>,
        vars: &mut ExecutionVars<K, Agg::Acc>,
        record: &Agg::Item,
    ) -> StreamExecutorResult<()> {
        let frame_seq = (this.frame_seq_extractor)(record);
        if let Some(cursor) = vars.next_frame_seq_to_emit {
            if frame_seq < cursor {
                // The frame's window is already emitted; in incremental mode
                // the frame is already merged into the sliding state, so
                // accepting the record would corrupt deduction.
                this.metrics.late_records_dropped.inc();
                tracing::warn!(
                    identity = %this.identity,
                    frame_seq,
                    cursor,
                    "dropping record behind the emission cursor"
                );
                return Ok(());
            }
        }
        let key = (this.key_extractor)(record);
        vars.frame_store.upsert(frame_seq, key, record, &this.agg)?;
        this.metrics.records_applied.inc();
        Ok(())
    }

    /// Decides the frame range `[start, end)` a marker completes and advances
    /// the cursor to `end`. Returns `None` when there is nothing to emit:
    /// either no frame is on record yet (the cursor stays uninitialized and
    /// will pick up from real data later) or the marker regressed.
    fn emission_range(
        this: &ExecutorInner<K, Agg>,
        vars: &mut ExecutionVars<K, Agg::Acc>,
        marker_seq: i64,
    ) -> Option<(i64, i64)> {
        let range_start = match vars.next_frame_seq_to_emit {
            Some(seq) => seq,
            None => vars.frame_store.min_frame_seq()?.min(marker_seq),
        };
        let range_end = this.window.higher_frame_seq(marker_seq);
        if range_end <= range_start {
            tracing::warn!(
                identity = %this.identity,
                marker_seq,
                cursor = range_start,
                "progress marker did not advance the emission cursor"
            );
            return None;
        }
        vars.next_frame_seq_to_emit = Some(range_end);
        tracing::trace!(
            identity = %this.identity,
            range_start,
            range_end,
            "emitting completed windows"
        );
        Some((range_start, range_end))
    }

    /// Folds the frames of the window ending at `frame_seq` into a fresh
    /// per-key map. Keys whose accumulator folds back to the empty
    /// accumulator are skipped, matching the incremental path, which removes
    /// exactly those entries from the sliding state.
    fn compute_window_from_scratch(
        this: &ExecutorInner<K, Agg>,
        vars: &ExecutionVars<K, Agg::Acc>,
        frame_seq: i64,
    ) -> StreamExecutorResult<Vec<(K, Agg::Acc)>> {
        let mut window: HashMap<K, Agg::Acc> = HashMap::new();
        let mut seq = this.window.lowest_frame_in_window(frame_seq);
        while seq <= frame_seq {
            if let Some(key_map) = vars.frame_store.get(seq) {
                for (key, acc) in key_map {
                    let cur = match window.remove(key) {
                        Some(cur) => cur,
                        None => this.agg.create_accumulator(),
                    };
                    window.insert(key.clone(), this.agg.combine(cur, acc)?);
                }
            }
            seq += this.window.frame_length();
        }
        Ok(window
            .into_iter()
            .filter(|(_, acc)| *acc != this.empty_acc)
            .collect())
    }

    /// Emits the result rows of every frame the marker completes, in
    /// ascending frame order. Each frame's window completion (trailing-frame
    /// eviction, sliding-state deduction) runs after the frame's rows have
    /// been consumed, exactly once per frame, also for empty windows.
    fn emit_windows<'a>(
        this: &'a ExecutorInner<K, Agg>,
        vars: &'a mut ExecutionVars<K, Agg::Acc>,
        marker_seq: i64,
    ) -> impl Stream<Item = StreamExecutorResult<FrameRecord<K, Agg::Output>>> + 'a {
        try_stream! {
            if let Some((range_start, range_end)) = Self::emission_range(this, vars, marker_seq) {
                let mut frame_seq = range_start;
                while frame_seq < range_end {
                    if this.window.is_tumbling() {
                        if let Some(key_map) = vars.frame_store.get(frame_seq) {
                            for (key, acc) in key_map {
                                let value = this.agg.finish(acc)?;
                                this.metrics.windowed_rows_emitted.inc();
                                yield FrameRecord {
                                    frame_seq,
                                    key: key.clone(),
                                    value,
                                };
                            }
                        }
                    } else if this.incremental {
                        vars.sliding_state
                            .merge_frame(&this.agg, vars.frame_store.get(frame_seq))?;
                        for (key, acc) in vars.sliding_state.iter() {
                            let value = this.agg.finish(acc)?;
                            this.metrics.windowed_rows_emitted.inc();
                            yield FrameRecord {
                                frame_seq,
                                key: key.clone(),
                                value,
                            };
                        }
                    } else {
                        let window = Self::compute_window_from_scratch(this, vars, frame_seq)?;
                        for (key, acc) in window {
                            let value = this.agg.finish(&acc)?;
                            this.metrics.windowed_rows_emitted.inc();
                            yield FrameRecord {
                                frame_seq,
                                key,
                                value,
                            };
                        }
                    }

                    // Window completion. The generator reaches this point
                    // once the frame's last row has been pulled downstream.
                    let trailing_frame_seq = this.window.lowest_frame_in_window(frame_seq);
                    let evicted = vars.frame_store.evict(trailing_frame_seq);
                    if this.incremental {
                        vars.sliding_state.retract_frame(&this.agg, evicted.as_ref())?;
                    }
                    this.metrics.windows_emitted.inc();

                    frame_seq += this.window.frame_length();
                }
            }
        }
    }

    fn execute_inner(
        self,
    ) -> impl Stream<Item = MessageStreamItem<FrameRecord<K, Agg::Output>>> {
        let Self { input, inner: this } = self;
        try_stream! {
            let mut input = input;
            let mut vars = ExecutionVars::new(this.empty_acc.clone());

            while let Some(msg) = input.next().await {
                let msg = msg?;
                match msg {
                    Message::Record(record) => {
                        Self::apply_record(&this, &mut vars, &record)?;
                    }
                    Message::Progress(marker) => {
                        {
                            let emission = Self::emit_windows(&this, &mut vars, marker.seq);
                            pin_mut!(emission);
                            while let Some(record) = emission.next().await {
                                let record = record?;
                                yield Message::Record(record);
                            }
                        }
                        yield Message::Progress(marker);
                    }
                }
            }
        }
    }
}

impl<K, Agg: Aggregator> std::fmt::Debug for SlidingWindowAggExecutor<K, Agg> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner.identity)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use expect_test::expect;
    use frameflow_aggregate::{Min, Result as AggregateResult, Sum};

    use super::super::test_utils::MockSource;
    use super::super::ProgressMarker;
    use super::*;

    /// `(frame_seq, key, value)`
    type TestRecord = (i64, i64, i64);

    fn frame_seq_of(record: &TestRecord) -> i64 {
        record.0
    }

    fn key_of(record: &TestRecord) -> i64 {
        record.1
    }

    fn value_of(record: &TestRecord) -> i64 {
        record.2
    }

    fn new_executor<Agg>(
        window: WindowDefinition,
        agg: Agg,
        source: MockSource<TestRecord>,
    ) -> SlidingWindowAggExecutor<i64, Agg>
    where
        Agg: Aggregator<Item = TestRecord> + Sync,
        Agg::Acc: Sync,
    {
        SlidingWindowAggExecutor::new(
            SlidingWindowAggArgs {
                window,
                agg,
                frame_seq_extractor: Box::new(frame_seq_of),
                key_extractor: Box::new(key_of),
                executor_id: 1,
                metrics: Arc::new(StreamingMetrics::unused()),
            },
            source.into_stream(),
        )
    }

    async fn run<Agg>(
        window: WindowDefinition,
        agg: Agg,
        source: MockSource<TestRecord>,
    ) -> Vec<Message<FrameRecord<i64, Agg::Output>>>
    where
        Agg: Aggregator<Item = TestRecord> + Sync,
        Agg::Acc: Sync,
    {
        collect(new_executor(window, agg, source).execute()).await
    }

    async fn collect<R>(
        mut stream: BoxedMessageStream<FrameRecord<i64, R>>,
    ) -> Vec<Message<FrameRecord<i64, R>>> {
        let mut out = Vec::new();
        while let Some(msg) = stream.next().await {
            out.push(msg.unwrap());
        }
        out
    }

    /// Renders an output sequence one line per message, sorting rows by
    /// `(frame_seq, key)` within each marker's batch since in-frame order is
    /// unspecified.
    fn transcript<R: std::fmt::Debug>(msgs: Vec<Message<FrameRecord<i64, R>>>) -> String {
        let mut lines = Vec::new();
        let mut pending: Vec<FrameRecord<i64, R>> = Vec::new();
        for msg in msgs {
            match msg {
                Message::Record(record) => pending.push(record),
                Message::Progress(marker) => {
                    pending.sort_by_key(|r| (r.frame_seq, r.key));
                    for r in pending.drain(..) {
                        lines.push(format!("frame {} key {} -> {:?}", r.frame_seq, r.key, r.value));
                    }
                    lines.push(format!("progress {}", marker.seq));
                }
            }
        }
        assert!(pending.is_empty(), "rows must be bounded by a marker");
        lines.join("\n")
    }

    /// White-box wiring for tests that inspect the execution state directly.
    fn sum_inner(
        window: WindowDefinition,
    ) -> ExecutorInner<i64, Sum<TestRecord, i64, fn(&TestRecord) -> i64>> {
        let agg = Sum::new(value_of as fn(&TestRecord) -> i64);
        let empty_acc = agg.create_accumulator();
        let incremental = !window.is_tumbling() && agg.supports_deduct();
        ExecutorInner {
            window,
            agg,
            frame_seq_extractor: Box::new(frame_seq_of),
            key_extractor: Box::new(key_of),
            empty_acc,
            incremental,
            identity: "SlidingWindowAggExecutor 1".to_string(),
            metrics: Arc::new(StreamingMetrics::unused()),
        }
    }

    /// An aggregation stripped of its deduction operator, to force the
    /// from-scratch path.
    struct NoDeduct<A>(A);

    impl<A: Aggregator> Aggregator for NoDeduct<A> {
        type Acc = A::Acc;
        type Item = A::Item;
        type Output = A::Output;

        fn create_accumulator(&self) -> Self::Acc {
            self.0.create_accumulator()
        }

        fn accumulate(&self, acc: Self::Acc, item: &Self::Item) -> AggregateResult<Self::Acc> {
            self.0.accumulate(acc, item)
        }

        fn combine(&self, acc: Self::Acc, other: &Self::Acc) -> AggregateResult<Self::Acc> {
            self.0.combine(acc, other)
        }

        fn finish(&self, acc: &Self::Acc) -> AggregateResult<Self::Output> {
            self.0.finish(acc)
        }
    }

    fn scenario_tumbling() -> MockSource<TestRecord> {
        let mut source = MockSource::new();
        source.push_records([(10, 1, 1), (10, 2, 2), (11, 1, 3)]);
        source.push_progress(11);
        source
    }

    fn scenario_sliding() -> MockSource<TestRecord> {
        let mut source = MockSource::new();
        source.push_records([(10, 1, 1), (11, 1, 2), (12, 1, 4), (13, 1, 8)]);
        source.push_progress(12);
        source.push_progress(13);
        source
    }

    #[tokio::test]
    async fn test_tumbling_per_frame() {
        let window = WindowDefinition::tumbling(1).unwrap();
        let out = run(window, Sum::new(value_of), scenario_tumbling()).await;
        expect![[r#"
            frame 10 key 1 -> 1
            frame 10 key 2 -> 2
            frame 11 key 1 -> 3
            progress 11"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_sliding_incremental() {
        let window = WindowDefinition::sliding(1, 3).unwrap();
        let out = run(window, Sum::new(value_of), scenario_sliding()).await;
        let replay = run(window, Sum::new(value_of), scenario_sliding()).await;
        // deterministic: an identically constructed operator replays equally
        assert_eq!(out, replay);
        expect![[r#"
            frame 10 key 1 -> 1
            frame 11 key 1 -> 3
            frame 12 key 1 -> 7
            progress 12
            frame 13 key 1 -> 14
            progress 13"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_sliding_from_scratch_matches_incremental() {
        let window = WindowDefinition::sliding(1, 3).unwrap();
        let incremental = run(window, Sum::new(value_of), scenario_sliding()).await;
        let from_scratch = run(window, NoDeduct(Sum::new(value_of)), scenario_sliding()).await;
        assert_eq!(transcript(incremental), transcript(from_scratch));
    }

    #[tokio::test]
    async fn test_empty_windows_still_advance() {
        let window = WindowDefinition::tumbling(1).unwrap();
        let mut source = MockSource::new();
        source.push_record((10, 1, 1));
        source.push_progress(12);
        let out = run(window, Sum::new(value_of), source).await;
        // frames 11 and 12 are empty windows: no rows, but the marker flows
        expect![[r#"
            frame 10 key 1 -> 1
            progress 12"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_marker_with_empty_store() {
        let window = WindowDefinition::tumbling(1).unwrap();
        let mut source = MockSource::new();
        source.push_progress(42);
        source.push_record((50, 1, 5));
        source.push_progress(50);
        let out = run(window, Sum::new(value_of), source).await;
        // the first marker is forwarded alone; the cursor initializes from
        // real data later, not from the stale marker
        assert_matches!(out[0], Message::Progress(ProgressMarker { seq: 42 }));
        assert_eq!(
            out.last().unwrap().as_progress(),
            Some(&ProgressMarker::new(50))
        );
        expect![[r#"
            progress 42
            frame 50 key 1 -> 5
            progress 50"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_marker_regression_is_tolerated() {
        let window = WindowDefinition::tumbling(1).unwrap();
        let mut source = MockSource::new();
        source.push_records([(10, 1, 1), (11, 1, 2), (12, 1, 4)]);
        source.push_progress(12);
        source.push_progress(10);
        source.push_progress(13);
        let out = run(window, Sum::new(value_of), source).await;
        // the regressed marker emits nothing and never moves the cursor
        // backward, so no frame is emitted twice
        expect![[r#"
            frame 10 key 1 -> 1
            frame 11 key 1 -> 2
            frame 12 key 1 -> 4
            progress 12
            progress 10
            progress 13"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_late_record_dropped() {
        let window = WindowDefinition::tumbling(1).unwrap();
        let metrics = Arc::new(StreamingMetrics::unused());
        let mut source = MockSource::new();
        source.push_record((10, 1, 1));
        source.push_progress(11);
        source.push_record((10, 1, 99));
        source.push_record((12, 1, 7));
        source.push_progress(12);
        let executor = SlidingWindowAggExecutor::new(
            SlidingWindowAggArgs {
                window,
                agg: Sum::new(value_of),
                frame_seq_extractor: Box::new(frame_seq_of),
                key_extractor: Box::new(key_of),
                executor_id: 1,
                metrics: metrics.clone(),
            },
            source.into_stream(),
        );
        let out = collect(executor.execute()).await;
        expect![[r#"
            frame 10 key 1 -> 1
            progress 11
            frame 12 key 1 -> 7
            progress 12"#]]
        .assert_eq(&transcript(out));
        assert_eq!(metrics.late_records_dropped.get(), 1);
    }

    #[tokio::test]
    async fn test_min_from_scratch() {
        let window = WindowDefinition::sliding(1, 2).unwrap();
        let mut source = MockSource::new();
        source.push_records([(10, 1, 3), (11, 1, 1), (12, 1, 5)]);
        source.push_progress(12);
        let out = run(window, Min::new(value_of), source).await;
        expect![[r#"
            frame 10 key 1 -> Some(3)
            frame 11 key 1 -> Some(1)
            frame 12 key 1 -> Some(1)
            progress 12"#]]
        .assert_eq(&transcript(out));
    }

    #[tokio::test]
    async fn test_cancelling_values_match_from_scratch() {
        // +5 and -5 cancel out over the window; the incremental path removes
        // the key from the sliding state and the from-scratch path must skip
        // it the same way
        let window = WindowDefinition::sliding(1, 3).unwrap();
        let build_source = || {
            let mut source = MockSource::new();
            source.push_records([(10, 1, 5), (11, 1, -5)]);
            for seq in 10..=14 {
                source.push_progress(seq);
            }
            source
        };
        let incremental = run(window, Sum::new(value_of), build_source()).await;
        let from_scratch = run(window, NoDeduct(Sum::new(value_of)), build_source()).await;
        assert_eq!(transcript(incremental.clone()), transcript(from_scratch));
        expect![[r#"
            frame 10 key 1 -> 5
            progress 10
            progress 11
            progress 12
            frame 13 key 1 -> -5
            progress 13
            progress 14"#]]
        .assert_eq(&transcript(incremental));
    }

    #[tokio::test]
    async fn test_eviction_after_emission() {
        let window = WindowDefinition::sliding(1, 3).unwrap();
        let this = sum_inner(window);
        let mut vars = ExecutionVars::new(this.empty_acc.clone());

        for seq in 10..=14 {
            SlidingWindowAggExecutor::apply_record(&this, &mut vars, &(seq, 1, 1)).unwrap();
        }
        for marker_seq in 10..=13 {
            let emission = SlidingWindowAggExecutor::emit_windows(&this, &mut vars, marker_seq);
            pin_mut!(emission);
            while let Some(row) = emission.next().await {
                row.unwrap();
            }
        }

        // after emitting frame 13, every frame at or below the trailing edge
        // (11) is gone
        assert_eq!(vars.next_frame_seq_to_emit, Some(14));
        assert!(!vars.frame_store.contains_frame(10));
        assert!(!vars.frame_store.contains_frame(11));
        assert!(vars.frame_store.contains_frame(12));
        assert!(vars.frame_store.contains_frame(13));
        assert!(vars.frame_store.contains_frame(14));
    }

    #[tokio::test]
    async fn test_sliding_state_hygiene() {
        let window = WindowDefinition::sliding(1, 3).unwrap();
        let this = sum_inner(window);
        let mut vars = ExecutionVars::new(this.empty_acc.clone());

        SlidingWindowAggExecutor::apply_record(&this, &mut vars, &(10, 1, 5)).unwrap();
        SlidingWindowAggExecutor::apply_record(&this, &mut vars, &(11, 1, -5)).unwrap();
        for marker_seq in 10..=14 {
            {
                let emission =
                    SlidingWindowAggExecutor::emit_windows(&this, &mut vars, marker_seq);
                pin_mut!(emission);
                while let Some(row) = emission.next().await {
                    row.unwrap();
                }
            }
            // the sliding state never holds an entry equal to the empty
            // accumulator
            assert!(vars.sliding_state.iter().all(|(_, acc)| *acc != 0));
        }
        assert!(vars.sliding_state.is_empty());
        assert!(vars.frame_store.is_empty());
    }
}
