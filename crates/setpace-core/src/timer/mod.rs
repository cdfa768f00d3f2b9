mod clock;
mod driver;
mod engine;
mod plan;
mod progress;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use driver::{DriverConfig, TimerHandle, DEFAULT_TICK_INTERVAL};
pub use engine::{create_timer, EventSink, TimerEngine, TimerState};
pub use plan::{
    build_plan, build_steps, BlockPauseOptions, Phase, PlanOptions, RunPlan, Step, EMPTY_RUN_KEY,
    FINISH_LABEL,
};
pub use progress::{progress_range_from_meta, ProgressRange, RunMeta, SetSpan, SpanKind, StepMeta};
