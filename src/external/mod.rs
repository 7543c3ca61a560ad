pub mod storage;
pub mod stripe;

pub use storage::*;
pub use stripe::*;
