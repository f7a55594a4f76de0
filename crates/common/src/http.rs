mod cors;
mod logging;
mod server;

pub use cors::*;
pub use logging::*;
pub use server::*;
