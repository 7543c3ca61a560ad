pub mod jwt;
pub mod pagination;
pub mod password;
pub mod toc;

pub use jwt::*;
pub use pagination::*;
pub use password::*;
pub use toc::*;
