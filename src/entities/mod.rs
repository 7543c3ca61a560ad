pub mod categories;
pub mod comments;
pub mod post_categories;
pub mod post_tags;
pub mod posts;
pub mod purchases;
pub mod settings;
pub mod tags;
pub mod users;

pub use categories as category_entity;
pub use comments as comment_entity;
pub use comments::CommentStatus;
pub use post_categories as post_category_entity;
pub use post_tags as post_tag_entity;
pub use posts as post_entity;
pub use posts::PostStatus;
pub use purchases as purchase_entity;
pub use settings as setting_entity;
pub use tags as tag_entity;
pub use users as user_entity;
pub use users::UserRole;
