//! Recording fakes shared by unit tests, scenario tests and benchmarks.

mod fakes;

pub use fakes::*;
