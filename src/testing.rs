//! Fixtures shared by the in-module test suites.

use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::{
    PostStatus, UserRole, category_entity, post_category_entity, post_entity, post_tag_entity,
    tag_entity, user_entity,
};

pub const TEST_PASSWORD: &str = "password123";

/// Fresh in-memory SQLite database with every migration applied.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn create_user(db: &DatabaseConnection, email: &str, role: UserRole) -> user_entity::Model {
    user_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        email: Set(email.to_string()),
        name: Set(Some(email.split('@').next().unwrap_or(email).to_string())),
        password_hash: Set(bcrypt::hash(TEST_PASSWORD, 4).unwrap()),
        role: Set(role),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .unwrap()
}

#[derive(Debug, Clone)]
pub struct PostFixture {
    slug: String,
    author_id: String,
    title: String,
    body: String,
    status: PostStatus,
    published_at: Option<DateTime<Utc>>,
    is_paid: bool,
    price_jpy: i64,
    read_time: i32,
    comments_enabled: bool,
}

impl PostFixture {
    pub fn published(slug: &str, author_id: &str) -> Self {
        Self {
            slug: slug.to_string(),
            author_id: author_id.to_string(),
            title: format!("Post {slug}"),
            body: "## Intro\n\nPlain words.\n\n## Outro\n\nThe end.".to_string(),
            status: PostStatus::Published,
            published_at: Some(Utc::now() - Duration::hours(1)),
            is_paid: false,
            price_jpy: 0,
            read_time: 5,
            comments_enabled: true,
        }
    }

    pub fn draft(slug: &str, author_id: &str) -> Self {
        Self {
            status: PostStatus::Draft,
            published_at: None,
            ..Self::published(slug, author_id)
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn paid(mut self, price_jpy: i64) -> Self {
        self.is_paid = true;
        self.price_jpy = price_jpy;
        self
    }

    pub fn read_time(mut self, minutes: i32) -> Self {
        self.read_time = minutes;
        self
    }

    pub fn comments_enabled(mut self, enabled: bool) -> Self {
        self.comments_enabled = enabled;
        self
    }
}

pub async fn create_post(db: &DatabaseConnection, fixture: PostFixture) -> post_entity::Model {
    let now = Utc::now();
    post_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        slug: Set(fixture.slug),
        title: Set(fixture.title),
        excerpt: Set("A short excerpt.".to_string()),
        body: Set(fixture.body),
        cover_image: Set(None),
        status: Set(fixture.status),
        published_at: Set(fixture.published_at),
        is_paid: Set(fixture.is_paid),
        price_jpy: Set(fixture.price_jpy),
        stripe_product_id: Set(None),
        stripe_price_id: Set(None),
        stripe_price_amount: Set(None),
        read_time: Set(fixture.read_time),
        comments_enabled: Set(fixture.comments_enabled),
        author_id: Set(fixture.author_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_category(db: &DatabaseConnection, name: &str, slug: &str) -> category_entity::Model {
    category_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_tag(db: &DatabaseConnection, name: &str, slug: &str) -> tag_entity::Model {
    tag_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn link_category(db: &DatabaseConnection, post_id: &str, category_id: &str) {
    post_category_entity::ActiveModel {
        post_id: Set(post_id.to_string()),
        category_id: Set(category_id.to_string()),
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn link_tag(db: &DatabaseConnection, post_id: &str, tag_id: &str) {
    post_tag_entity::ActiveModel {
        post_id: Set(post_id.to_string()),
        tag_id: Set(tag_id.to_string()),
    }
    .insert(db)
    .await
    .unwrap();
}
