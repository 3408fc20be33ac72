mod error;
mod reporting;
mod supervisor;

pub use self::{
    error::EngineError,
    reporting::{StatsReport, StatsReporter},
    supervisor::{wait_for_shutdown_signal, Supervisor},
};

pub mod prelude {
    pub use super::{EngineError, StatsReport, StatsReporter, Supervisor};
}
