pub mod brt;
pub mod exe;
pub mod fsd;
pub mod lzp;
pub mod lzx;
pub mod rolz;
pub mod slice;
pub mod utf;
