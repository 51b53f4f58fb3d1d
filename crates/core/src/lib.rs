#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod session;
pub mod time;

pub use error::Error;
pub use session::{ExamSession, ExamSessionError, Progress, Screen, Tick};
pub use time::Clock;
