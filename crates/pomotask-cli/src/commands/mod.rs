pub mod config;
pub mod interruptions;
pub mod stats;
pub mod task;
pub mod timer;
