mod capture;
mod clone;
mod convert;

pub use capture::run_capture;
pub use clone::run_clone;
pub use convert::run_convert;
