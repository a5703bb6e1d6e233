// Shared fixtures for admin-records integration tests
#![allow(dead_code)]

use std::sync::Arc;

use admin_records::{BackendGateway, Collection, Config, MemoryGateway, User};
use serde_json::{json, Map, Value};

pub fn user(id: &str, nick_name: &str, created_date: f64) -> User {
    User {
        id: id.to_string(),
        nick_name: nick_name.to_string(),
        birth: "1996-05-17".to_string(),
        mbti: "intj".to_string(),
        phone_number: format!("010{}", id),
        image_urls: vec![format!("https://images.pico.dev/{}.png", id)],
        created_date,
        extra: Map::new(),
    }
}

pub fn like(liked_user_id: &str, like_type: &str, created_date: f64) -> Value {
    json!({
        "likedUserId": liked_user_id,
        "likeType": like_type,
        "createdDate": created_date,
        "nickName": liked_user_id,
        "mbti": "enfp",
        "age": 27,
    })
}

/// Active users `u00..` with nicknames `nick00..`, newer ids have later sign-up dates
pub async fn seed_active_users(gateway: &MemoryGateway, count: usize) -> Vec<User> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        let u = user(&format!("u{:02}", i), &format!("nick{:02}", i), 1_000.0 + i as f64);
        gateway
            .insert(&Collection::Users, &u.id, serde_json::to_value(&u).unwrap())
            .await;
        users.push(u);
    }
    users
}

/// Suspended user wrapped in a 7-day stop record, created at 1.0
pub async fn seed_suspended(gateway: &MemoryGateway, id: &str, nick_name: &str) -> User {
    let u = user(id, nick_name, 1.0);
    gateway
        .insert(
            &Collection::Stop,
            id,
            json!({ "createdDate": 5.0, "during": 7, "phoneNumber": u.phone_number, "user": u }),
        )
        .await;
    u
}

pub async fn seed_likes(gateway: &MemoryGateway, owner: &str, likes: Vec<Value>) {
    gateway
        .insert(
            &Collection::Likes,
            owner,
            json!({ "userId": owner, "recivedlikes": likes }),
        )
        .await;
}

pub fn shared(gateway: &MemoryGateway) -> Arc<dyn BackendGateway> {
    Arc::new(gateway.clone())
}

pub fn config(users_per_page: usize, records_per_page: usize) -> Config {
    let mut config = Config::default();
    config.paging.users_per_page = users_per_page;
    config.paging.records_per_page = records_per_page;
    config
}
