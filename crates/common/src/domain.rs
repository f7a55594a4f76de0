mod device;
mod outcome;
mod result;

pub use device::*;
pub use outcome::*;
pub use result::*;
