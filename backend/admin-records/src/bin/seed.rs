//! Seed the document store with demo members and activity buckets
//! Run with: cargo run --bin seed

use admin_records::models::now_timestamp;
use admin_records::{BackendGateway, Collection, Config, Database};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const NICK_NAMES: [&str; 8] = ["mina", "jun", "seoyeon", "haneul", "doyun", "yuna", "minho", "jisoo"];
const MBTIS: [&str; 4] = ["enfp", "istj", "infj", "estp"];
const DAY: f64 = 86_400.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admin_records=debug,seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::connect(&config).await?;
    db.run_migrations().await?;
    let gateway = db.gateway();

    let user_count: usize = std::env::var("SEED_USERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(40);

    let now = now_timestamp();
    let mut ids = Vec::with_capacity(user_count);

    for i in 0..user_count {
        let id = Uuid::new_v4().to_string();
        let user = json!({
            "id": id,
            "nickName": format!("{}{}", NICK_NAMES[i % NICK_NAMES.len()], i),
            "birth": format!("{}-0{}-1{}", 1985 + (i % 15), 1 + (i % 9), i % 10),
            "mbti": MBTIS[i % MBTIS.len()],
            "phoneNumber": format!("010{:08}", i),
            "imageURLs": [format!("https://images.pico.dev/{}.png", id)],
            "createdDate": now - (i as f64) * DAY,
        });
        gateway.set_document(&Collection::Users, &id, user).await?;
        ids.push(id);
    }
    tracing::info!(users = ids.len(), "Seeded users");

    for (i, id) in ids.iter().enumerate() {
        seed_buckets(gateway.as_ref(), id, &ids, i, now).await?;
    }
    tracing::info!("Seeded record buckets");

    println!("\n========================================");
    println!("Seed complete: {} users", ids.len());
    println!("========================================");

    Ok(())
}

async fn seed_buckets(
    gateway: &dyn BackendGateway,
    owner: &str,
    ids: &[String],
    offset: usize,
    now: f64,
) -> anyhow::Result<()> {
    let counterpart = |n: usize| ids[(offset + n + 1) % ids.len()].clone();
    let like_types = ["like", "dislike", "matching"];

    let likes: Vec<Value> = (0..15)
        .map(|n| {
            json!({
                "likedUserId": counterpart(n),
                "likeType": like_types[n % like_types.len()],
                "createdDate": now - (n as f64) * 3_600.0,
                "nickName": NICK_NAMES[n % NICK_NAMES.len()],
                "mbti": MBTIS[n % MBTIS.len()],
                "age": 20 + n % 10,
            })
        })
        .collect();
    gateway
        .set_document(&Collection::Likes, owner, json!({ "userId": owner, "recivedlikes": likes }))
        .await?;

    let reports: Vec<Value> = (0..offset % 4)
        .map(|n| {
            json!({
                "reportedUserId": counterpart(n),
                "reason": "Inappropriate profile photo",
                "createdDate": now - (n as f64) * DAY,
            })
        })
        .collect();
    let report_bucket = Collection::Report {
        owner: owner.to_string(),
    };
    gateway
        .set_document(&report_bucket, owner, json!({ "userId": owner, "recivedReport": reports }))
        .await?;

    let blocks: Vec<Value> = (0..offset % 3)
        .map(|n| {
            json!({
                "blockedUserId": counterpart(n),
                "createdDate": now - (n as f64) * DAY,
            })
        })
        .collect();
    let block_bucket = Collection::Block {
        owner: owner.to_string(),
    };
    gateway
        .set_document(&block_bucket, owner, json!({ "userId": owner, "recivedBlock": blocks }))
        .await?;

    if offset % 2 == 0 {
        let payments: Vec<Value> = (0..3)
            .map(|n| {
                json!({
                    "price": 1_100 * (n + 1),
                    "purchaseChuCount": 10 * (n + 1),
                    "paymentType": "purchase",
                    "purchasedDate": now - (n as f64) * 7.0 * DAY,
                })
            })
            .collect();
        gateway
            .set_document(&Collection::Payment, owner, json!({ "userId": owner, "paymentInfos": payments }))
            .await?;
    }

    Ok(())
}
