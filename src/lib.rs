#![forbid(unsafe_code)]

pub mod compose;
pub mod core;
pub mod ease;
pub mod encode;
pub mod error;
pub mod guide;
pub mod interp;
pub mod job;
pub mod model;
pub mod noise;
pub mod path;
pub mod queue;
pub mod scheduler;
pub mod style;
pub mod stylize;

pub use crate::core::{Canvas, Fps, FrameIndex, Point, Rgba, Vec2, stable_hash64};
pub use compose::{FrameDocument, StrokePrim, compose_frame};
pub use ease::Ease;
pub use encode::OutputFormat;
pub use error::{ErrorKind, ScrawlError, ScrawlResult};
pub use job::{JobControl, JobOutcome, JobStatus, OutputSpec, RenderJob};
pub use model::{Fill, Keyframe, Layer, PathData, Scene, Shape, ShapeStyle, SubPath};
pub use queue::{InMemoryQueue, JobQueue};
pub use scheduler::{
    Cancellations, JobExecutor, JobResult, SchedulerConfig, WorkerScheduler,
};
pub use style::{PresetCatalog, StylePreset};
pub use stylize::{SketchStroke, StylizationSeed};
