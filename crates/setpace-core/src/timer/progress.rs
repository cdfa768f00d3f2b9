//! Set-level progress metadata.
//!
//! A UI meter for a set spans several steps (work, rest, work...). [`RunMeta`]
//! records, per step, the fraction of its set's total duration where the step
//! begins and ends, so the meter can fill continuously across step changes
//! instead of resetting at each one.

use serde::{Deserialize, Serialize};

use super::plan::{Phase, Step};

/// What a span of steps belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Prep,
    Set,
    BlockPause,
}

/// A run of consecutive steps sharing one progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSpan {
    pub kind: SpanKind,
    pub block_idx: usize,
    pub set_idx: usize,
    /// Index of the first step in the span.
    pub first_step: usize,
    pub step_count: usize,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMeta {
    /// Index into [`RunMeta::spans`].
    pub span: usize,
    pub start: f64,
    pub end: f64,
}

/// Per-step fractional ranges, built once with the plan and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub spans: Vec<SetSpan>,
    pub steps: Vec<StepMeta>,
}

impl RunMeta {
    pub fn from_steps(steps: &[Step]) -> Self {
        let mut spans: Vec<SetSpan> = Vec::new();
        let mut span_of_step = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let kind = span_kind(step.label);
            let joins_previous = spans.last().is_some_and(|span| {
                kind == SpanKind::Set
                    && span.kind == SpanKind::Set
                    && span.block_idx == step.block_idx
                    && span.set_idx == step.set_idx
            });
            if !joins_previous {
                spans.push(SetSpan {
                    kind,
                    block_idx: step.block_idx,
                    set_idx: step.set_idx,
                    first_step: index,
                    step_count: 0,
                    total_ms: 0,
                });
            }
            let span_idx = spans.len() - 1;
            let span = &mut spans[span_idx];
            span.step_count += 1;
            span.total_ms = span.total_ms.saturating_add(step.duration_ms);
            span_of_step.push(span_idx);
        }

        let mut elapsed_in_span = vec![0u64; spans.len()];
        let metas = steps
            .iter()
            .zip(span_of_step)
            .map(|(step, span_idx)| {
                let total = spans[span_idx].total_ms;
                let before = elapsed_in_span[span_idx];
                let after = before.saturating_add(step.duration_ms);
                elapsed_in_span[span_idx] = after;
                StepMeta {
                    span: span_idx,
                    start: fraction(before, total),
                    end: fraction(after, total),
                }
            })
            .collect();

        Self {
            spans,
            steps: metas,
        }
    }

    pub fn step(&self, step_index: usize) -> Option<&StepMeta> {
        self.steps.get(step_index)
    }

    pub fn span_for(&self, step_index: usize) -> Option<&SetSpan> {
        self.step(step_index).and_then(|m| self.spans.get(m.span))
    }
}

fn span_kind(phase: Phase) -> SpanKind {
    match phase {
        Phase::Prep => SpanKind::Prep,
        Phase::BlockPause => SpanKind::BlockPause,
        Phase::Work | Phase::Rest => SpanKind::Set,
    }
}

fn fraction(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Where a step sits on its parent bar, and how long it takes to fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRange {
    pub step_duration_ms: u64,
    pub start_progress: f64,
    pub end_progress: f64,
}

/// Look up the bar range for `step` at `step_index`.
///
/// Zero-duration steps snap (`start == end`). A step the metadata does not
/// know about gets the whole bar.
pub fn progress_range_from_meta(meta: &RunMeta, step_index: usize, step: &Step) -> ProgressRange {
    let step_duration_ms = step.duration_ms;
    match meta.step(step_index) {
        Some(m) => ProgressRange {
            step_duration_ms,
            start_progress: m.start,
            end_progress: m.end,
        },
        None if step_duration_ms == 0 => ProgressRange {
            step_duration_ms,
            start_progress: 0.0,
            end_progress: 0.0,
        },
        None => ProgressRange {
            step_duration_ms,
            start_progress: 0.0,
            end_progress: 1.0,
        },
    }
}
