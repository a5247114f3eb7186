mod recording;

pub use recording::*;
