pub mod discovery;
pub mod port;

pub use discovery::find_usb_device;
pub use port::{open_console, poll_console, PollSettings};
