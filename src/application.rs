//! Application layer module
//!
//! Orchestrates the domain seams into the scan/diff/notify/persist cycle.

pub mod catalog_scanner;
pub mod poll_loop;

pub use catalog_scanner::{CatalogScanner, ScanError, ScanPolicy, ScanResult, ScanWarning};
pub use poll_loop::{CycleError, CyclePhase, CycleReport, LoopSettings, PollLoop};
