//! Store-side effects that follow a write: derived bootcamp aggregates and
//! cascading deletes.

pub mod aggregates;
pub mod bootcamps;

pub use aggregates::{refresh_average_cost, refresh_average_rating};
pub use bootcamps::cascade_delete;
