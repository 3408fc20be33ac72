//! # hitmon-core
//!
//! Second-resolution traffic time series for the access log monitor.
//!
//! ### Key Submodules:
//! - `event`: hit events and section derivation
//! - `bucket`: one second of aggregated traffic
//! - `store`: retention-bounded series with windowed rate and top-K queries
//! - `aggregator`: folds the hit stream into buckets
//! - `clock`: wall clock abstraction used for every "now"

pub mod aggregator;
pub mod bucket;
pub mod clock;
pub mod error;
pub mod event;
pub mod store;

pub mod prelude {
    pub use crate::aggregator::*;
    pub use crate::bucket::*;
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::event::*;
    pub use crate::store::*;
}

pub use aggregator::Aggregator;
pub use bucket::Bucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MonitorError, StoreError};
pub use event::{HitEvent, Section, NO_SECTION};
pub use store::{Rate, RateSource, SectionRanking, SectionStats, TimeSeriesStore};
