//! Integration tests for the notification hub: connection lifecycle, group
//! membership operations, and event routing.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsRead = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;
type WsWrite = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Helper: start the server on a random port and return (base_url, addr).
async fn start_test_server() -> (String, SocketAddr) {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = funews_server::db::init_db(&data_dir).expect("Failed to init DB");
    funews_server::seed_admin_account(&db, "admin@funews.org", "admin123")
        .expect("Failed to seed admin");

    let state = funews_server::state::AppState::new(db);
    let app = funews_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    let base_url = format!("http://{}", addr);
    (base_url, addr)
}

/// Log in and return (token, account_id).
async fn login(base_url: &str, email: &str, password: &str) -> (String, i64) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Login failed for {}", email);
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["accountId"].as_i64().unwrap(),
    )
}

/// Create an account via the admin API and return its id.
async fn create_account(
    base_url: &str,
    admin_token: &str,
    name: &str,
    email: &str,
    role: i32,
) -> i64 {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/accounts", base_url))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "name": name, "email": email, "password": "pass123", "role": role }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Account creation failed for {}", email);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Connect to the hub, optionally with a session token.
async fn connect_hub(addr: &SocketAddr, token: Option<&str>) -> (WsWrite, WsRead) {
    let url = match token {
        Some(token) => format!("ws://{}/notificationHub?token={}", addr, token),
        None => format!("ws://{}/notificationHub", addr),
    };
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect to hub");
    ws_stream.split()
}

/// Send a hub operation with a requestId and wait for its ack.
async fn invoke(write: &mut WsWrite, read: &mut WsRead, op: serde_json::Value) -> serde_json::Value {
    write
        .send(Message::Text(op.to_string().into()))
        .await
        .expect("Failed to send hub op");
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
            .await
            .expect("Timed out waiting for ack")
            .expect("Stream ended")
            .expect("Receive error");
        if let Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value.get("requestId").is_some() {
                return value;
            }
        }
    }
}

/// Collect every event frame arriving within the window.
async fn collect_events(read: &mut WsRead, window: Duration) -> Vec<serde_json::Value> {
    let mut events = Vec::new();
    loop {
        match tokio::time::timeout(window, read.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                if value.get("event").is_some() {
                    events.push(value);
                }
            }
            Ok(Some(Ok(_))) => continue,
            _ => break,
        }
    }
    events
}

async fn create_category(base_url: &str, token: &str, name: &str) -> i64 {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/categories", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_article(base_url: &str, token: &str, category_id: i64, title: &str) -> String {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/articles", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": title,
            "content": "Original content",
            "categoryId": category_id,
            "isPublished": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_anonymous_connection_receives_broadcasts() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    let account_id = create_account(&base_url, &admin_token, "Temp", "temp@funews.org", 2).await;

    let (_write, mut read) = connect_hub(&addr, None).await;

    // Deleting the account broadcasts AccountDeactivated to all connections
    let resp = reqwest::Client::new()
        .delete(format!("{}/api/accounts/{}", base_url, account_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let events = collect_events(&mut read, Duration::from_millis(500)).await;
    let deactivated: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "AccountDeactivated")
        .collect();
    assert_eq!(deactivated.len(), 1);
    assert_eq!(deactivated[0]["accountId"], account_id.to_string());
}

#[tokio::test]
async fn test_role_group_round_trip_via_ops() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;

    let (mut write, mut read) = connect_hub(&addr, None).await;

    // Join Staff, then leave it again
    let ack = invoke(
        &mut write,
        &mut read,
        json!({ "op": "RegisterUserRole", "role": 1, "requestId": "r1" }),
    )
    .await;
    assert_eq!(ack["group"], "Staff");

    invoke(
        &mut write,
        &mut read,
        json!({ "op": "UnregisterUserRole", "role": 1, "requestId": "r2" }),
    )
    .await;

    // A Staff-targeted event must no longer reach this connection
    create_account(&base_url, &admin_token, "New", "new@funews.org", 1).await;

    let events = collect_events(&mut read, Duration::from_millis(400)).await;
    assert!(
        events
            .iter()
            .all(|e| e["event"] != "ReceiveNewAccountNotification"),
        "Left connection still received a Staff event: {:?}",
        events
    );
}

#[tokio::test]
async fn test_unmapped_role_code_acks_empty_group() {
    let (_base_url, addr) = start_test_server().await;
    let (mut write, mut read) = connect_hub(&addr, None).await;

    let ack = invoke(
        &mut write,
        &mut read,
        json!({ "op": "RegisterUserRole", "role": 7, "requestId": "r1" }),
    )
    .await;
    assert_eq!(ack["group"], "");

    let ack = invoke(
        &mut write,
        &mut read,
        json!({ "op": "UnregisterUserRole", "role": 7, "requestId": "r2" }),
    )
    .await;
    assert_eq!(ack["group"], "");
}

#[tokio::test]
async fn test_article_update_reaches_viewers_not_bystanders() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    create_account(&base_url, &admin_token, "Writer", "writer@funews.org", 1).await;
    let (staff_token, _) = login(&base_url, "writer@funews.org", "pass123").await;

    let category_id = create_category(&base_url, &staff_token, "World").await;
    let article_id = create_article(&base_url, &staff_token, category_id, "Breaking").await;

    // C1 views the article page, C2 is connected but elsewhere
    let (mut w1, mut r1) = connect_hub(&addr, None).await;
    let (_w2, mut r2) = connect_hub(&addr, None).await;
    invoke(
        &mut w1,
        &mut r1,
        json!({ "op": "JoinArticleGroup", "articleId": article_id, "requestId": "j1" }),
    )
    .await;

    let resp = reqwest::Client::new()
        .put(format!("{}/api/articles/{}", base_url, article_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "title": "Breaking (edited)",
            "content": "Updated content",
            "categoryId": category_id,
            "isPublished": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let viewer_events = collect_events(&mut r1, Duration::from_millis(500)).await;
    let updated: Vec<_> = viewer_events
        .iter()
        .filter(|e| e["event"] == "ArticleUpdated")
        .collect();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["articleId"], article_id);
    assert_eq!(updated[0]["title"], "Breaking (edited)");
    assert_eq!(updated[0]["content"], "Updated content");

    let bystander_events = collect_events(&mut r2, Duration::from_millis(300)).await;
    assert!(
        bystander_events.is_empty(),
        "Bystander received: {:?}",
        bystander_events
    );
}

#[tokio::test]
async fn test_force_logout_reaches_reconnected_connection_once() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    let account_id = create_account(&base_url, &admin_token, "Victim", "victim@funews.org", 2).await;

    // First connection joins the account group, then disconnects
    {
        let (mut w1, mut r1) = connect_hub(&addr, None).await;
        invoke(
            &mut w1,
            &mut r1,
            json!({ "op": "RegisterConnection", "accountId": account_id.to_string(), "requestId": "a1" }),
        )
        .await;
        w1.send(Message::Close(None)).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Reconnect and re-join the account group from scratch
    let (mut w2, mut r2) = connect_hub(&addr, None).await;
    let ack = invoke(
        &mut w2,
        &mut r2,
        json!({ "op": "RegisterConnection", "accountId": account_id.to_string(), "requestId": "a2" }),
    )
    .await;
    assert_eq!(ack["group"], format!("account_{}", account_id));

    // Deactivate the account
    let resp = reqwest::Client::new()
        .put(format!("{}/api/accounts/{}", base_url, account_id))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({ "name": "Victim", "role": 2, "isActive": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let events = collect_events(&mut r2, Duration::from_millis(500)).await;
    let force_logouts: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "ForceLogout")
        .collect();
    assert_eq!(
        force_logouts.len(),
        1,
        "Expected exactly one ForceLogout, got {:?}",
        events
    );
    assert_eq!(force_logouts[0]["reason"], "account_deactivated");
}

#[tokio::test]
async fn test_dashboard_update_only_reaches_dashboard_group() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    create_account(&base_url, &admin_token, "Writer", "writer@funews.org", 1).await;
    let (staff_token, _) = login(&base_url, "writer@funews.org", "pass123").await;

    // One connection watches the dashboard; an authenticated admin connection
    // does not (auto-joined to the Admin role group only).
    let (mut dash_w, mut dash_r) = connect_hub(&addr, None).await;
    invoke(
        &mut dash_w,
        &mut dash_r,
        json!({ "op": "JoinDashboardGroup", "requestId": "d1" }),
    )
    .await;
    let (_admin_w, mut admin_r) = connect_hub(&addr, Some(&admin_token)).await;

    create_category(&base_url, &staff_token, "Politics").await;

    let dash_events = collect_events(&mut dash_r, Duration::from_millis(500)).await;
    let updates: Vec<_> = dash_events
        .iter()
        .filter(|e| e["event"] == "DashboardUpdate")
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["eventType"], "create");
    assert_eq!(updates[0]["entityType"], "category");

    // The admin connection gets the category list-reload broadcast, but no
    // DashboardUpdate — it never joined admin_dashboard.
    let admin_events = collect_events(&mut admin_r, Duration::from_millis(300)).await;
    assert!(admin_events.iter().any(|e| e["event"] == "ReloadCategoryList"));
    assert!(admin_events.iter().all(|e| e["event"] != "DashboardUpdate"));
}

#[tokio::test]
async fn test_tag_event_reaches_role_groups_not_anonymous() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    create_account(&base_url, &admin_token, "Writer", "writer@funews.org", 1).await;
    let (staff_token, _) = login(&base_url, "writer@funews.org", "pass123").await;

    // Staff connection auto-joins its role group from session claims
    let (_staff_w, mut staff_r) = connect_hub(&addr, Some(&staff_token)).await;
    // Lecturer joins explicitly
    let (mut lect_w, mut lect_r) = connect_hub(&addr, None).await;
    invoke(
        &mut lect_w,
        &mut lect_r,
        json!({ "op": "RegisterUserRole", "role": 2, "requestId": "l1" }),
    )
    .await;
    // Unauthenticated connection in no group
    let (_anon_w, mut anon_r) = connect_hub(&addr, None).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/tags", base_url))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({ "name": "economy", "note": "markets" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    for reader in [&mut staff_r, &mut lect_r] {
        let events = collect_events(reader, Duration::from_millis(500)).await;
        let created: Vec<_> = events.iter().filter(|e| e["event"] == "TagCreated").collect();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0]["name"], "economy");
        assert_eq!(created[0]["note"], "markets");
    }

    let anon_events = collect_events(&mut anon_r, Duration::from_millis(300)).await;
    assert!(anon_events.is_empty(), "Anonymous received: {:?}", anon_events);
}

#[tokio::test]
async fn test_broadcast_after_disconnect_completes_without_error() {
    let (base_url, addr) = start_test_server().await;
    let (admin_token, _) = login(&base_url, "admin@funews.org", "admin123").await;
    create_account(&base_url, &admin_token, "Writer", "writer@funews.org", 1).await;
    let (staff_token, _) = login(&base_url, "writer@funews.org", "pass123").await;
    let category_id = create_category(&base_url, &staff_token, "Tech").await;
    let article_id = create_article(&base_url, &staff_token, category_id, "Post").await;

    // Join the article group, then drop the connection abruptly
    {
        let (mut w, mut r) = connect_hub(&addr, None).await;
        invoke(
            &mut w,
            &mut r,
            json!({ "op": "JoinArticleGroup", "articleId": article_id, "requestId": "j1" }),
        )
        .await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The update now targets an empty article group — must still succeed
    let resp = reqwest::Client::new()
        .put(format!("{}/api/articles/{}", base_url, article_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "title": "Post",
            "content": "No one is watching",
            "categoryId": category_id,
            "isPublished": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_ws_ping_pong() {
    let (_base_url, addr) = start_test_server().await;
    let (mut write, mut read) = connect_hub(&addr, None).await;

    write
        .send(Message::Ping(vec![42, 43, 44].into()))
        .await
        .expect("Failed to send ping");

    let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Expected pong within timeout");

    match msg {
        Some(Ok(Message::Pong(data))) => {
            assert_eq!(data.as_ref(), &[42, 43, 44], "Pong data should match ping");
        }
        other => {
            panic!("Expected Pong message, got: {:?}", other);
        }
    }
}

#[tokio::test]
async fn test_malformed_frame_does_not_kill_connection() {
    let (_base_url, addr) = start_test_server().await;
    let (mut write, mut read) = connect_hub(&addr, None).await;

    write
        .send(Message::Text("{not valid json".into()))
        .await
        .unwrap();

    // Error reply arrives and the connection keeps working
    let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
        .await
        .expect("Expected error reply")
        .unwrap()
        .unwrap();
    match msg {
        Message::Text(text) => {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["error"], "Invalid hub request");
        }
        other => panic!("Expected text error reply, got {:?}", other),
    }

    let ack = invoke(
        &mut write,
        &mut read,
        json!({ "op": "RegisterUserRole", "role": 0, "requestId": "still-alive" }),
    )
    .await;
    assert_eq!(ack["group"], "Admin");
}
