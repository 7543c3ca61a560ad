pub mod admin_post;
pub mod auth;
pub mod checkout;
pub mod comment;
pub mod common;
pub mod media;
pub mod post;
pub mod setting;

pub use admin_post::*;
pub use auth::*;
pub use checkout::*;
pub use comment::*;
pub use common::*;
pub use media::*;
pub use post::*;
pub use setting::*;
