mod rmi_error;
pub use rmi_error::*;
