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

use crate::error::{AggregateError, Result};

/// Describes fixed-length frames and the window they roll up into.
///
/// A window covers `window_length / frame_length` consecutive frames; when
/// the two lengths are equal the window is tumbling. Frame sequences are
/// aligned to multiples of `frame_length` relative to an implicit epoch;
/// negative sequences are legal and the grid math uses floor division so
/// they align the same way positive ones do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDefinition {
    frame_length: i64,
    window_length: i64,
}

impl WindowDefinition {
    /// A sliding window of `window_length`, advancing by `frame_length`.
    /// `window_length` must be a positive multiple of `frame_length`.
    pub fn sliding(frame_length: i64, window_length: i64) -> Result<Self> {
        if frame_length <= 0 {
            return Err(AggregateError::InvalidParam {
                name: "frame_length",
                reason: format!("must be positive, got {frame_length}").into(),
            });
        }
        if window_length <= 0 || window_length % frame_length != 0 {
            return Err(AggregateError::InvalidParam {
                name: "window_length",
                reason: format!(
                    "must be a positive multiple of frame_length {frame_length}, got {window_length}"
                )
                .into(),
            });
        }
        Ok(Self {
            frame_length,
            window_length,
        })
    }

    /// A tumbling window: window length equals frame length.
    pub fn tumbling(frame_length: i64) -> Result<Self> {
        Self::sliding(frame_length, frame_length)
    }

    pub fn frame_length(&self) -> i64 {
        self.frame_length
    }

    pub fn window_length(&self) -> i64 {
        self.window_length
    }

    pub fn is_tumbling(&self) -> bool {
        self.window_length == self.frame_length
    }

    pub fn frames_per_window(&self) -> i64 {
        self.window_length / self.frame_length
    }

    /// The smallest frame sequence strictly greater than `seq` and aligned
    /// to the frame grid.
    pub fn higher_frame_seq(&self, seq: i64) -> i64 {
        (seq.div_euclid(self.frame_length) + 1) * self.frame_length
    }

    /// The trailing (lowest) frame of the window that emits at `frame_seq`.
    pub fn lowest_frame_in_window(&self, frame_seq: i64) -> i64 {
        frame_seq - self.window_length + self.frame_length
    }
}
