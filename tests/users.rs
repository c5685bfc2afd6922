use std::collections::HashSet;

use pfoertner::{
    create_app,
    settings::{AppConfig, AuthConfig, Config, DbConfig},
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::{postgres::PgConnectOptions, Connection, Executor, PgConnection, Row};
use tokio::spawn;
use uuid::Uuid;

async fn spawn_app() -> (String, reqwest::Client, PgConnection) {
    let db_name = Uuid::new_v4().to_string();

    let config = Config {
        database: DbConfig::Parameters {
            username: "pfoertner".to_owned(),
            password: "password".to_owned(),
            host: "localhost".to_owned(),
            port: None,
            db_name: Some(db_name.clone()),
        },
        app: AppConfig {
            port: 0,
            allowed_origins: HashSet::new(),
            allow_localhost: true,
        },
        auth: AuthConfig {
            token_secret: "test-secret".to_owned(),
            token_validity_hours: 1,
        },
    };

    let connect_options: PgConnectOptions =
        TryInto::try_into(&config.database).expect("Creating PgConnectOptions");

    // First connect without the fresh database since we need to create it
    let mut db_client = PgConnection::connect_with(&connect_options.clone().database("pfoertner"))
        .await
        .expect("Connecting to DB");

    db_client
        .execute(format!(r#"CREATE DATABASE  "{db_name}" "#).as_str())
        .await
        .expect("Failed creating database");

    let mut db_client = PgConnection::connect_with(&connect_options)
        .await
        .expect("Connecting to DB");

    sqlx::migrate!("./migrations")
        .run(&mut db_client)
        .await
        .expect("Failed to run migrations");

    let (addr, app) = create_app(config).await.expect("Failed to create app");

    spawn(async { app.await.expect("Running the server") });

    (format!("http://{addr}"), reqwest::Client::new(), db_client)
}

async fn register(
    base_url: &str,
    client: &reqwest::Client,
    body: &Value,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/users"))
        .json(body)
        .send()
        .await
        .expect("Failed to send request")
}

/// Registers a throwaway user and returns its login token
async fn register_and_login(base_url: &str, client: &reqwest::Client) -> String {
    let response = register(
        base_url,
        client,
        &json!({
            "username": "bob",
            "name": "Bob",
            "email": "b@x.com",
            "password": "pw1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    login(base_url, client, "b@x.com", "pw1").await
}

async fn login(base_url: &str, client: &reqwest::Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{base_url}/users/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing login response");
    let token = body["token"].as_str().expect("Token missing").to_owned();
    assert!(!token.is_empty());

    token
}

#[tokio::test]
async fn health_check_works() {
    let (base_url, client, _) = spawn_app().await;

    let response = client
        .get(format!("{base_url}/health_check"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn register_works() {
    let (base_url, client, mut db_client) = spawn_app().await;

    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "bob",
            "name": "Bob Tester",
            "email": "b@x.com",
            "password": "pw1",
            "mobile": "555",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["username"], "bob");
    assert_eq!(body["name"], "Bob Tester");
    assert_eq!(body["email"], "b@x.com");
    assert!(body["id"].is_string());
    // The password must not be echoed back, in no shape
    assert!(body.get("password").is_none());

    let row = sqlx::query("SELECT password FROM users WHERE email = $1")
        .bind("b@x.com")
        .fetch_one(&mut db_client)
        .await
        .expect("Failed to fetch created user");
    let stored: String = row.get("password");

    // Stored as an argon2 hash, not the plaintext
    assert_ne!(stored, "pw1");
    assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn register_rejects_taken_email_and_username() {
    let (base_url, client, _) = spawn_app().await;

    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "bob",
            "name": "Bob",
            "email": "b@x.com",
            "password": "pw1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same email, different username
    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "robert",
            "name": "Robert",
            "email": "b@x.com",
            "password": "pw2",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["reason"], "User already exists");

    // Same username, different email
    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "bob",
            "name": "Bob II",
            "email": "b2@x.com",
            "password": "pw2",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["reason"], "User already exists");
}

#[tokio::test]
async fn register_returns_422_when_data_is_missing() {
    let (base_url, client, _) = spawn_app().await;

    let test_cases = [
        (
            json!({
                "username": "bob",
                "name": "Bob",
                "password": "pw1",
            }),
            "missing the email",
        ),
        (
            json!({
                "username": "bob",
                "name": "Bob",
                "email": "b@x.com",
            }),
            "missing the password",
        ),
        (
            json!({
                "name": "Bob",
                "email": "b@x.com",
                "password": "pw1",
            }),
            "missing the username",
        ),
    ];

    for (data, reason) in test_cases {
        let response = register(&base_url, &client, &data).await;

        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "The API did not fail with 422 Unprocessable Entity when the payload was {reason}"
        )
    }
}

#[tokio::test]
async fn login_returns_profile_and_token() {
    let (base_url, client, _) = spawn_app().await;

    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "bob",
            "name": "Bob",
            "email": "b@x.com",
            "password": "pw1",
            "nationality": "DE",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{base_url}/users/login"))
        .json(&json!({ "email": "b@x.com", "password": "pw1" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["username"], "bob");
    assert_eq!(body["email"], "b@x.com");
    assert_eq!(body["nationality"], "DE");
    assert_eq!(body["isAdmin"], false);
    assert!(!body["token"].as_str().expect("Token missing").is_empty());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (base_url, client, _) = spawn_app().await;

    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "bob",
            "name": "Bob",
            "email": "b@x.com",
            "password": "pw1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let wrong_password = client
        .post(format!("{base_url}/users/login"))
        .json(&json!({ "email": "b@x.com", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");
    let unknown_email = client
        .post(format!("{base_url}/users/login"))
        .json(&json!({ "email": "nobody@x.com", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    // Byte-identical bodies, no probing which emails have accounts
    let wrong_password = wrong_password.text().await.expect("Reading body");
    let unknown_email = unknown_email.text().await.expect("Reading body");
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn profile_requires_a_token() {
    let (base_url, client, _) = spawn_app().await;

    let response = client
        .get(format!("{base_url}/users/profile"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{base_url}/users/profile"))
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_round_trip_works() {
    let (base_url, client, _) = spawn_app().await;
    let token = register_and_login(&base_url, &client).await;

    let response = client
        .get(format!("{base_url}/users/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["username"], "bob");
    assert_eq!(body["name"], "Bob");
    assert_eq!(body["email"], "b@x.com");
    assert_eq!(body["isAdmin"], false);
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn update_changes_only_present_fields() {
    let (base_url, client, _) = spawn_app().await;
    let token = register_and_login(&base_url, &client).await;

    let response = client
        .put(format!("{base_url}/users/profile"))
        .bearer_auth(&token)
        .json(&json!({ "mobile": "555" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["mobile"], "555");
    assert_eq!(body["name"], "Bob");
    assert!(!body["token"].as_str().expect("Token missing").is_empty());

    // Everything not present in the update kept its value
    let response = client
        .get(format!("{base_url}/users/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["mobile"], "555");
    assert_eq!(body["name"], "Bob");
    assert_eq!(body["username"], "bob");
    assert_eq!(body["email"], "b@x.com");
    assert_eq!(body["nationality"], Value::Null);
}

#[tokio::test]
async fn update_writes_present_empty_strings_verbatim() {
    let (base_url, client, _) = spawn_app().await;
    let token = register_and_login(&base_url, &client).await;

    // Presence is the signal, not truthiness: an explicit empty
    // string is written
    let response = client
        .put(format!("{base_url}/users/profile"))
        .bearer_auth(&token)
        .json(&json!({ "name": "" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["name"], "");
}

#[tokio::test]
async fn update_rejects_taken_username() {
    let (base_url, client, _) = spawn_app().await;

    let response = register(
        &base_url,
        &client,
        &json!({
            "username": "alice",
            "name": "Alice",
            "email": "a@x.com",
            "password": "pw2",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = register_and_login(&base_url, &client).await;

    let response = client
        .put(format!("{base_url}/users/profile"))
        .bearer_auth(&token)
        .json(&json!({ "username": "alice" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Parsing response");
    assert_eq!(body["reason"], "User already exists");
}

#[tokio::test]
async fn listing_requires_an_admin() {
    let (base_url, client, _) = spawn_app().await;
    let token = register_and_login(&base_url, &client).await;

    let response = client
        .get(format!("{base_url}/users"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_list_users_without_seeing_hashes() {
    let (base_url, client, _) = spawn_app().await;
    let _ = register_and_login(&base_url, &client).await;

    // The bootstrap admin created on the empty database
    let token = login(&base_url, &client, "admin@example.com", "password").await;

    let response = client
        .get(format!("{base_url}/users"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Parsing response");
    let users = body["users"].as_array().expect("Users missing");
    assert_eq!(users.len(), 2);

    for user in users {
        assert!(user.get("password").is_none());
        assert!(user["isAdmin"].is_boolean());
    }
}
