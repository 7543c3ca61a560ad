//! Populates a fresh database with an admin account, taxonomy, sample posts and default settings.
//! Re-running skips anything that already exists (matched by email, slug or setting key).

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use uuid::Uuid;

use otoko_press::{
    config::Config,
    database::{create_pool, run_migrations},
    entities::{
        PostStatus, UserRole, category_entity, post_category_entity, post_entity, post_tag_entity,
        tag_entity,
    },
    models::{ADS_KEY, AFFILIATE_KEY, COMMENTS_KEY, SEO_KEY},
    repositories::UserRepository,
    services::SettingService,
    utils::{hash_password, validate_password},
};

const ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASSWORD: &str = "Admin123!";
const PAID_PRICE_JPY: i64 = 980;

const CATEGORIES: &[(&str, &str)] = &[
    ("Career", "career"),
    ("Wellness", "wellness"),
    ("Lifestyle", "lifestyle"),
    ("Relationships", "relationships"),
];

const TAGS: &[(&str, &str)] = &[
    ("Mental health", "mental-health"),
    ("Work-life balance", "work-life"),
    ("Sauna", "sauna"),
    ("Fitness", "fitness"),
    ("Dating", "dating"),
    ("Career change", "career-change"),
];

struct SamplePost {
    slug: &'static str,
    title: &'static str,
    excerpt: &'static str,
    body: &'static str,
    categories: &'static [&'static str],
    tags: &'static [&'static str],
    is_paid: bool,
}

const POSTS: &[SamplePost] = &[
    SamplePost {
        slug: "first-side-job-story",
        title: "What my first side job taught me about evenings",
        excerpt: "Keeping a day job and a side project alive without losing sleep.",
        body: "# What my first side job taught me about evenings\n\n\
               Finding time after work was the hard part.\n\n\
               ## Plan in thirty-minute blocks\n\n\
               Commute and lunch breaks take the small tasks so evenings stay for real work.\n\n\
               ## Avoid screen fatigue\n\n\
               Short stretches every twenty minutes and heavy tasks only on weekend mornings.\n",
        categories: &["career"],
        tags: &["work-life", "career-change"],
        is_paid: false,
    },
    SamplePost {
        slug: "relationship-reset",
        title: "Ten years married: a weekly reset habit",
        excerpt: "A small routine that keeps minor frustrations from piling up.",
        body: "# Ten years married: a weekly reset habit\n\n\
               Long relationships need a place to clear small misunderstandings quickly.\n\n\
               ## A weekly check-in\n\n\
               Thirty minutes on the shared calendar for thanks and honest notes.\n\n\
               ## Write it down\n\n\
               A shared note keeps track of what was agreed.\n",
        categories: &["relationships"],
        tags: &["dating", "mental-health"],
        is_paid: true,
    },
    SamplePost {
        slug: "sauna-reset-routine",
        title: "The sauna routine that fixed my Monday mornings",
        excerpt: "Heat, cold water and rest: a repeatable sauna cycle for busy weeks.",
        body: "# The sauna routine that fixed my Monday mornings\n\n\
               A Sunday evening sauna turned out to be the best start to the week.\n\n\
               ## Three rounds\n\n\
               Eight minutes of heat, one minute of cold water, ten minutes of rest.\n\n\
               ### Hydration\n\n\
               Half a litre of water before the first round.\n\n\
               ## What changed\n\n\
               Deeper sleep and a calmer head on Monday.\n",
        categories: &["wellness", "lifestyle"],
        tags: &["sauna", "mental-health"],
        is_paid: true,
    },
    SamplePost {
        slug: "gym-after-forty",
        title: "Starting strength training after forty",
        excerpt: "Three sessions a week, compound lifts, and patience.",
        body: "# Starting strength training after forty\n\n\
               It is never too late to start lifting.\n\n\
               ## Keep it simple\n\n\
               Squat, press and deadlift, three times a week.\n\n\
               ## Recover on purpose\n\n\
               Sleep and protein matter more than the programme.\n",
        categories: &["wellness"],
        tags: &["fitness"],
        is_paid: false,
    },
];

async fn seed_admin(db: &DatabaseConnection) -> Result<String> {
    let users = UserRepository::new(db.clone());
    if let Some(admin) = users.find_by_email(ADMIN_EMAIL).await? {
        log::info!("Admin {} already present", ADMIN_EMAIL);
        return Ok(admin.id);
    }

    let password =
        std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
    validate_password(&password).context("SEED_ADMIN_PASSWORD is not a usable password")?;
    let hash = hash_password(&password)?;
    let admin = users
        .create(ADMIN_EMAIL, Some("Admin"), &hash, UserRole::Admin)
        .await?;
    log::info!("Created admin {}", admin.email);
    Ok(admin.id)
}

async fn seed_category(db: &DatabaseConnection, name: &str, slug: &str) -> Result<String> {
    if let Some(existing) = category_entity::Entity::find()
        .filter(category_entity::Column::Slug.eq(slug))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }
    let created = category_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

async fn seed_tag(db: &DatabaseConnection, name: &str, slug: &str) -> Result<String> {
    if let Some(existing) = tag_entity::Entity::find()
        .filter(tag_entity::Column::Slug.eq(slug))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }
    let created = tag_entity::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
    }
    .insert(db)
    .await?;
    Ok(created.id)
}

fn lookup<'a>(ids: &'a [(&str, String)], slug: &str) -> Option<&'a str> {
    ids.iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, id)| id.as_str())
}

async fn seed_posts(
    db: &DatabaseConnection,
    author_id: &str,
    categories: &[(&str, String)],
    tags: &[(&str, String)],
) -> Result<usize> {
    let now = Utc::now();
    let mut created = 0;

    for (index, sample) in POSTS.iter().enumerate() {
        let exists = post_entity::Entity::find()
            .filter(post_entity::Column::Slug.eq(sample.slug))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let post = post_entity::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            slug: Set(sample.slug.to_string()),
            title: Set(sample.title.to_string()),
            excerpt: Set(sample.excerpt.to_string()),
            body: Set(sample.body.to_string()),
            cover_image: Set(None),
            status: Set(PostStatus::Published),
            published_at: Set(Some(now - Duration::days(index as i64))),
            is_paid: Set(sample.is_paid),
            price_jpy: Set(if sample.is_paid { PAID_PRICE_JPY } else { 0 }),
            stripe_product_id: Set(None),
            stripe_price_id: Set(None),
            stripe_price_amount: Set(None),
            read_time: Set(7 + index as i32),
            comments_enabled: Set(index % 2 == 0),
            author_id: Set(author_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        for category_id in sample.categories.iter().filter_map(|slug| lookup(categories, slug)) {
            post_category_entity::ActiveModel {
                post_id: Set(post.id.clone()),
                category_id: Set(category_id.to_string()),
            }
            .insert(db)
            .await?;
        }
        for tag_id in sample.tags.iter().filter_map(|slug| lookup(tags, slug)) {
            post_tag_entity::ActiveModel {
                post_id: Set(post.id.clone()),
                tag_id: Set(tag_id.to_string()),
            }
            .insert(db)
            .await?;
        }
        created += 1;
    }
    Ok(created)
}

fn default_settings() -> Vec<(&'static str, Value)> {
    vec![
        (
            ADS_KEY,
            json!({
                "articleTop": "article-top",
                "articleInline": "article-inline",
                "articleBottom": "article-bottom"
            }),
        ),
        (
            SEO_KEY,
            json!({
                "defaultTitle": "Otoko Press",
                "defaultDescription": "First-hand stories on work, health and style for men"
            }),
        ),
        (
            AFFILIATE_KEY,
            json!({ "utmSource": "otoko-press", "partnerId": "demo" }),
        ),
        (COMMENTS_KEY, json!({ "enabled": true })),
    ]
}

async fn seed_settings(db: &DatabaseConnection) -> Result<()> {
    let settings = SettingService::new(db.clone());
    for (key, value) in default_settings() {
        if settings.get(key).await?.is_none() {
            settings.update(key, value).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
    let db = create_pool(&config.database)
        .await
        .context("failed to connect to the database")?;
    run_migrations(&db).await.context("failed to run migrations")?;

    let admin_id = seed_admin(&db).await?;

    let mut category_ids = Vec::new();
    for (name, slug) in CATEGORIES {
        category_ids.push((*slug, seed_category(&db, name, slug).await?));
    }
    let mut tag_ids = Vec::new();
    for (name, slug) in TAGS {
        tag_ids.push((*slug, seed_tag(&db, name, slug).await?));
    }

    let created = seed_posts(&db, &admin_id, &category_ids, &tag_ids).await?;
    seed_settings(&db).await?;

    log::info!(
        "Seed complete: {} categories, {} tags, {} new posts",
        category_ids.len(),
        tag_ids.len(),
        created
    );
    Ok(())
}
