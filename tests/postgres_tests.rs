// Runs against a live PostgreSQL only when DATABASE_URL is set
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::*;

use karigar_connect::{
    app,
    models::{
        catalog::{CategoryPatch, NewCategory, NewProduct, ProductPatch},
        user::{NewUser, UserPatch},
        RecordId,
    },
    services::storage::{PostgresStorage, Storage, StorageError},
};

/// One test so the schema bootstrap never races itself
#[tokio::test]
async fn test_postgres_backend() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL tests");
        return;
    };

    let storage = PostgresStorage::connect(&url, 5, Duration::from_secs(5))
        .await
        .unwrap();
    storage.health_check().await.unwrap();
    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

    // Storage level
    let user = storage
        .create_user(NewUser {
            username: format!("pg_user_{}", suffix),
            email: format!("pg_user_{}@example.com", suffix),
            password: "hash.salt".to_string(),
            first_name: None,
            last_name: None,
            is_artisan: false,
            location: Some("Kutch".to_string()),
            bio: None,
        })
        .await
        .unwrap();
    assert!(user.id.is_valid());
    assert_eq!(
        storage.get_user_by_username(&user.username).await.unwrap().unwrap().id,
        user.id
    );

    let duplicate = storage
        .create_user(NewUser {
            username: user.username.clone(),
            email: format!("other_{}@example.com", suffix),
            password: "hash.salt".to_string(),
            first_name: None,
            last_name: None,
            is_artisan: false,
            location: None,
            bio: None,
        })
        .await;
    assert!(matches!(duplicate, Err(StorageError::Conflict(_))));

    let updated = storage
        .update_user(
            user.id,
            UserPatch {
                is_artisan: Some(true),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(updated.is_artisan);
    assert_eq!(updated.location.as_deref(), Some("Kutch"));
    assert!(storage
        .update_user(RecordId::new(i64::MAX), UserPatch::default())
        .await
        .unwrap()
        .is_none());

    let category = storage
        .create_category(NewCategory {
            name: format!("Cat {}", suffix % 100_000),
            description: None,
            image_url: None,
        })
        .await
        .unwrap();
    let product = storage
        .create_product(NewProduct {
            name: "Ajrakh stole".to_string(),
            description: "Resist dyed with natural colours".to_string(),
            price: 2400.0,
            category_id: category.id,
            image_url: None,
            stock: None,
            artisan_id: user.id,
            featured: None,
        })
        .await
        .unwrap();
    assert_eq!(product.stock, 0);
    let by_artisan = storage.list_products_by_artisan(user.id).await.unwrap();
    assert_eq!(by_artisan.len(), 1);
    assert_eq!(by_artisan[0].id, product.id);

    let restocked = storage
        .update_product(
            product.id,
            ProductPatch {
                stock: Some(7),
                ..ProductPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restocked.stock, 7);
    assert_eq!(restocked.name, "Ajrakh stole");
    let described = storage
        .update_category(
            category.id,
            CategoryPatch {
                description: Some("Resist printing".to_string()),
                ..CategoryPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(described.name, category.name);
    assert!(storage
        .update_category(RecordId::new(i64::MAX), CategoryPatch::default())
        .await
        .unwrap()
        .is_none());

    // Through the router
    let router = app(test_state(test_config(), Arc::new(storage)));
    let username = format!("pg_http_{}", suffix);
    let (token, _) = register(&router, &username).await;

    let (status, json) = post(
        &router,
        "/api/login",
        None,
        json!({ "username": username, "password": "secret123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["user"]["username"], username);

    let (status, json) = get(&router, "/api/user", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].get("password").is_none());

    let (_, json) = get(&router, "/health", None).await;
    assert_eq!(json["storage"]["backend"], "postgres");
    assert_eq!(json["status"], "ok");
}
