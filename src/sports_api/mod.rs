mod client;
mod result_source;

pub use client::*;
pub use result_source::*;
