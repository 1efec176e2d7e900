#[cfg(feature = "driver")]
mod driver;
#[cfg(feature = "driver")]
pub use driver::*;

mod driver_config;
pub use driver_config::*;
