pub mod format;
pub mod writer;

pub use format::format_record;
pub use writer::{log_line, LogTarget};
