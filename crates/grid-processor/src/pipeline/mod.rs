//! End-to-end pipeline stages.
//!
//! Both stages are synchronous batch jobs: every error aborts the run and
//! nothing is retried.

mod aggregator;
mod comparator;

pub use aggregator::{aggregate, resolve_window, AggregateOutput};
pub use comparator::{compare, compare_fields, load_input, Comparison};
