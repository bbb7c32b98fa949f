//! Trimmer - the Trello timer
//!
//! This library turns the move history of cards on a pipeline-style board
//! into a report of how many hours each card spent in each monitored list,
//! summed across re-entries and measured up to now for the current list.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod filter;
pub mod model;
pub mod movement;
pub mod pipeline;
pub mod report;
pub mod residency;
pub mod timestamp;
pub mod trello;
