//! Logo asset loading and image decoding helpers.

pub mod decode;
pub mod logo;
