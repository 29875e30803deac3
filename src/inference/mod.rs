//! The request pipeline: bytes in, interpreted detection out.

mod pipeline;

pub use pipeline::{Detection, InferencePipeline, RankedClass};
