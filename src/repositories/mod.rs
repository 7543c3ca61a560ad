pub mod category_repository;
pub mod comment_repository;
pub mod post_admin_repository;
pub mod post_repository;
pub mod purchase_repository;
pub mod setting_repository;
pub mod tag_repository;
pub mod user_repository;

pub use category_repository::*;
pub use comment_repository::*;
pub use post_admin_repository::*;
pub use post_repository::*;
pub use purchase_repository::*;
pub use setting_repository::*;
pub use tag_repository::*;
pub use user_repository::*;
