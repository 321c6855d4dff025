pub mod rsa;

pub use crate::rsa::*;
