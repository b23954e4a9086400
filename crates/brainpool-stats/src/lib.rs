//! Summary statistics for training diagnostics.
//!
//! - [`descriptive::DescriptiveStats`] summarizes a complete dataset, such as
//!   the values of one weight tensor
//! - [`descriptive::RunningStats`] accumulates a stream, such as training
//!   losses over a run
//!
//! Both skip non-finite values instead of letting one NaN poison the summary.

pub mod descriptive;
