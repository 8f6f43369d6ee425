// tests/api_tests.rs

use std::sync::Arc;

use quizhall::{
    config::Config,
    routes,
    state::AppState,
    store::{DynStore, MemoryStore},
};
use reqwest::StatusCode;
use serde_json::{Value, json};

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // 1. Fresh in-memory store per test
    let store: DynStore = Arc::new(MemoryStore::new());

    // 2. Create test configuration and state
    let config = Config::for_secret("test_secret_for_integration_tests");
    let state = AppState { store, config };

    // 3. Create the router with the app state
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a user with a unique email and returns its bearer token.
async fn register(client: &reqwest::Client, address: &str, role: &str) -> String {
    let email = format!("{}_{}@example.com", role, uuid::Uuid::new_v4());
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({
            "name": format!("Test {}", role),
            "email": email,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_quiz(client: &reqwest::Client, address: &str, token: &str, extra: Value) -> Value {
    let mut body = json!({
        "title": "Borrow checker basics",
        "category": "rust",
        "timeLimit": 10,
        "isPublished": true,
        "attemptsAllowed": 1,
        "questions": [
            { "questionText": "Who owns a value?", "options": ["one owner", "many owners"], "correctAnswer": 0 },
            { "questionText": "&mut is?", "options": ["shared", "exclusive"], "correctAnswer": 1, "marks": 2 }
        ]
    });
    if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }

    let response = client
        .post(format!("{}/api/quiz", address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn submit(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    body: Value,
) -> reqwest::Response {
    client
        .post(format!("{}/api/attempt/submit", address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_login_and_me() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "name": "Ada", "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["role"], "student");
    assert!(body["user"].get("password").is_none());

    let duplicate = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "name": "Ada", "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let wrong = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let unknown = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let wrong_body: Value = wrong.json().await.unwrap();
    let unknown_body: Value = unknown.json().await.unwrap();
    assert_eq!(wrong_body, unknown_body);

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": email.to_uppercase(), "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let token = login.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], email);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "name": "Bob", "email": "not-an-email", "password": "123" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/quiz", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{}/api/stats/dashboard", address))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_manage_quizzes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let student = register(&client, &address, "student").await;

    let response = client
        .post(format!("{}/api/quiz", address))
        .bearer_auth(&student)
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/api/analytics/1", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn quiz_flow_submit_and_limit() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let student = register(&client, &address, "student").await;
    let quiz = create_quiz(&client, &address, &admin, json!({})).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Students see the quiz without answers
    let listed: Value = client
        .get(format!("{}/api/quiz", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["attemptsMade"], 0);
    assert_eq!(listed[0]["canAttempt"], true);
    assert!(listed[0]["questions"][0].get("correctAnswer").is_none());

    // Act
    let response = submit(
        &client,
        &address,
        &student,
        json!({ "quizId": quiz_id, "answers": { "0": 0, "1": 0, "7": 3 } }),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["totalMarks"], 3);
    assert_eq!(result["timeTaken"], 600);
    assert_eq!(result["quiz"]["questions"][1]["correctAnswer"], 1);

    let second = submit(&client, &address, &student, json!({ "quizId": quiz_id, "answers": {} })).await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);

    let mine: Value = client
        .get(format!("{}/api/attempt/user/{}", address, quiz_id))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["answers"]["0"], 0);

    let dashboard: Value = client
        .get(format!("{}/api/stats/dashboard", address))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["totalQuizzes"], 1);
    assert_eq!(dashboard["totalAttempts"], 1);
    assert_eq!(dashboard["averageScore"], 33);
    assert_eq!(dashboard["completedQuizzes"], 1);
}

#[tokio::test]
async fn unpublished_quiz_is_hidden_from_students() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let student = register(&client, &address, "student").await;
    let draft = create_quiz(&client, &address, &admin, json!({ "isPublished": false })).await;
    let draft_id = draft["id"].as_i64().unwrap();

    let response = client
        .get(format!("{}/api/quiz/{}", address, draft_id))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = submit(&client, &address, &student, json!({ "quizId": draft_id, "answers": {} })).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/api/quiz/{}", address, draft_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_protected_quiz() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let student = register(&client, &address, "student").await;
    let quiz = create_quiz(
        &client,
        &address,
        &admin,
        json!({ "quizPassword": "opensesame", "attemptsAllowed": "3" }),
    )
    .await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    assert_eq!(quiz["requiresPassword"], true);
    assert!(quiz.get("quizPassword").is_none());
    assert!(quiz.get("passwordHash").is_none());

    let verify = |password: Value| {
        let client = client.clone();
        let url = format!("{}/api/quiz/{}/verify-password", address, quiz_id);
        let token = student.clone();
        async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&json!({ "password": password }))
                .send()
                .await
                .unwrap()
                .status()
        }
    };
    assert_eq!(verify(Value::Null).await, StatusCode::UNAUTHORIZED);
    assert_eq!(verify(json!("wrong")).await, StatusCode::FORBIDDEN);
    assert_eq!(verify(json!("opensesame")).await, StatusCode::OK);

    let missing = submit(&client, &address, &student, json!({ "quizId": quiz_id, "answers": {} })).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = submit(
        &client,
        &address,
        &student,
        json!({ "quizId": quiz_id, "answers": {}, "password": "wrong" }),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let ok = submit(
        &client,
        &address,
        &student,
        json!({ "quizId": quiz_id, "answers": { "0": 0, "1": 1 }, "password": "opensesame" }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let result: Value = ok.json().await.unwrap();
    assert_eq!(result["percentage"], 100.0);
}

#[tokio::test]
async fn only_the_owner_manages_a_quiz() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register(&client, &address, "admin").await;
    let other = register(&client, &address, "admin").await;
    let quiz = create_quiz(&client, &address, &owner, json!({})).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    let response = client
        .put(format!("{}/api/quiz/{}", address, quiz_id))
        .bearer_auth(&other)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .delete(format!("{}/api/quiz/{}", address, quiz_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("{}/api/analytics/{}", address, quiz_id))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .put(format!("{}/api/quiz/{}", address, quiz_id))
        .bearer_auth(&owner)
        .json(&json!({ "title": "Renamed", "attemptsAllowed": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["attemptsAllowed"], 1);
    assert_eq!(updated["questions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn analytics_and_delete_cascade() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let quiz = create_quiz(&client, &address, &admin, json!({})).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    for answers in [json!({ "0": 0, "1": 1 }), json!({ "0": 0 }), json!({ "0": 1 })] {
        let student = register(&client, &address, "student").await;
        let response = submit(
            &client,
            &address,
            &student,
            json!({ "quizId": quiz_id, "answers": answers }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Act
    let analytics: Value = client
        .get(format!("{}/api/analytics/{}", address, quiz_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(analytics["totalAttempts"], 3);
    assert_eq!(analytics["highestScore"], 100.0);
    assert_eq!(analytics["lowestScore"], 0.0);
    assert_eq!(analytics["recentAttempts"].as_array().unwrap().len(), 3);
    let first = &analytics["questionAnalytics"][0];
    assert_eq!(first["correctAnswers"], 2);
    assert_eq!(first["totalAnswers"], 3);
    let pct = first["correctPercentage"].as_f64().unwrap();
    assert!((pct - 200.0 / 3.0).abs() < 1e-9);

    let dashboard: Value = client
        .get(format!("{}/api/stats/dashboard", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard["totalQuizzes"], 1);
    assert_eq!(dashboard["totalAttempts"], 3);
    assert_eq!(dashboard["completedQuizzes"], 1);

    let response = client
        .delete(format!("{}/api/quiz/{}", address, quiz_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/api/analytics/{}", address, quiz_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_quiz_rejects_invalid_questions() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;

    let response = client
        .post(format!("{}/api/quiz", address))
        .bearer_auth(&admin)
        .json(&json!({
            "title": "Broken",
            "questions": [{ "questionText": "Q", "options": ["a", "b"], "correctAnswer": 5 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn odd_answer_keys_are_scored_leniently() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let student = register(&client, &address, "student").await;
    let quiz = create_quiz(&client, &address, &admin, json!({})).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Act
    let response = submit(
        &client,
        &address,
        &student,
        json!({ "quizId": quiz_id, "answers": { "0": 0, "-1": 1, "x": 1, "1": null } }),
    )
    .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["answers"]["x"], 1);
    assert!(result["answers"]["1"].is_null());
}

#[tokio::test]
async fn past_attempts_can_be_reviewed_with_answers() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = register(&client, &address, "admin").await;
    let student = register(&client, &address, "student").await;
    let other = register(&client, &address, "student").await;
    let quiz = create_quiz(&client, &address, &admin, json!({ "attemptsAllowed": 2 })).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    let response = submit(
        &client,
        &address,
        &student,
        json!({ "quizId": quiz_id, "answers": { "0": 1 } }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Act
    let fetch = |token: String| {
        let client = client.clone();
        let url = format!("{}/api/quiz/{}", address, quiz_id);
        async move {
            client
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    };
    let reviewed = fetch(student.clone()).await;
    let untouched = fetch(other.clone()).await;

    // Assert
    assert_eq!(reviewed["attemptsMade"], 1);
    assert_eq!(reviewed["questions"][0]["correctAnswer"], 0);
    assert_eq!(reviewed["questions"][1]["correctAnswer"], 1);
    assert!(untouched["questions"][0].get("correctAnswer").is_none());
}

#[tokio::test]
async fn malformed_json_bodies_get_json_errors() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let student = register(&client, &address, "student").await;

    // Act
    let broken = client
        .post(format!("{}/api/attempt/submit", address))
        .bearer_auth(&student)
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .expect("Failed to execute request");
    let missing_field = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "email": "a@example.com" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(broken.status(), StatusCode::BAD_REQUEST);
    let body: Value = broken.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
    let body: Value = missing_field.json().await.unwrap();
    assert!(body["error"].is_string());
}
