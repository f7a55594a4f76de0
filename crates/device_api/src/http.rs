mod device_handler;
mod problem;
mod router;

pub use device_handler::*;
pub use problem::*;
pub use router::*;
