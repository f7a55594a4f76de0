mod device_repository;

pub use device_repository::*;
