//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod post_code;
pub mod report;

pub use post_code::post_code_task;
pub use report::report_task;
