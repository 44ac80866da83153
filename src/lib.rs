pub mod bitstream;
pub mod config;
pub mod entropy;
pub mod error;
pub mod hash;
pub mod listener;
pub mod predictor;
pub mod support;
pub mod threadpool;
pub mod timefn;
pub mod transform;
pub mod util;
