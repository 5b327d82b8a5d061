pub mod accumulator;

pub use accumulator::{Accumulated, Fragment, OutputMode, StreamAccumulator};
