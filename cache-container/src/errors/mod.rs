mod fixture_error;

pub use fixture_error::*;
