pub mod relay;
pub mod runner;
pub mod stats;

pub use relay::{
    FrameConsumer, FrameListener, FrameProducer, FrameRelay, FrameStorage, Interrupter,
};
pub use runner::{PipelineSummary, PipelineThreads};
pub use stats::RelayStatsSnapshot;
