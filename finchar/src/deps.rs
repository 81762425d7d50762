//! Re-exports of dependencies that appear in the public API.

pub use arcstr;
pub use num_complex;
