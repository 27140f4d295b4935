use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_api::config::ApiConfig;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory stores, cheap hashing), on an ephemeral port.
        let app = stockroom_api::app::build_app(&ApiConfig::for_tests("test-secret"))
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A fresh browser-like client with its own cookie jar.
    fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap()
    }

    /// Register `username` on a new client; the client keeps the session cookie.
    async fn signed_up(&self, username: &str) -> (reqwest::Client, Value) {
        let client = self.client();
        let res = client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": "secret1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "register {username}");
        let body: Value = res.json().await.unwrap();
        (client, body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn item_body(available: i64) -> Value {
    json!({
        "itemNumber": "SOFA-100",
        "description": "Grey sectional sofa",
        "available": available,
        "vendor": "Ashley",
        "warehouse": "Big Warehouse",
    })
}

async fn create_item(srv: &TestServer, client: &reqwest::Client, body: Value) -> Value {
    let res = client
        .post(srv.url("/inventory"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["data"]["item"].clone()
}

async fn add_layaway(srv: &TestServer, client: &reqwest::Client, item_id: &str) -> Value {
    let res = client
        .post(srv.url(&format!("/inventory/{item_id}/layaway")))
        .json(&json!({ "customerName": "Jane Doe", "phone": "555-0100" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn error_of(res: reqwest::Response) -> (StatusCode, String) {
    let status = res.status();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    (status, body["error"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client().get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = srv.client();

    for path in ["/inventory", "/inventory/stats", "/vendors", "/auth/me", "/admin/users"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["code"], "unauthorized", "{path}");
    }

    let res = client
        .get(srv.url("/inventory"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_user_becomes_admin_and_gets_a_session_cookie() {
    let srv = TestServer::spawn().await;
    let client = srv.client();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "owner_1", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth-token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["user"]["isAdmin"], true);
    assert_eq!(body["data"]["message"], "Account created as admin (first user)");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let me: Value = client
        .get(srv.url("/auth/me"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["user"]["username"], "owner_1");

    let (_, second) = srv.signed_up("clerk_2").await;
    assert_eq!(second["data"]["user"]["isAdmin"], false);
    assert_eq!(second["data"]["message"], "Account created successfully");
}

#[tokio::test]
async fn registration_and_login_validation() {
    let srv = TestServer::spawn().await;
    let client = srv.client();

    let cases = [
        (json!({ "username": "ab", "password": "secret1" }), "Username must be between 3 and 30 characters"),
        (json!({ "username": "alice", "password": "short" }), "Password must be at least 6 characters"),
        (json!({ "username": "bad name", "password": "secret1" }), "Username can only contain letters, numbers, and underscores"),
        (json!({ "username": "alice" }), "Username and password are required"),
    ];
    for (body, message) in cases {
        let res = client.post(srv.url("/auth/register")).json(&body).send().await.unwrap();
        assert_eq!(error_of(res).await, (StatusCode::BAD_REQUEST, message.to_string()));
    }

    srv.signed_up("alice").await;
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "username": "alice", "password": "secret2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_of(res).await, (StatusCode::CONFLICT, "Username already exists".to_string()));

    for body in [
        json!({ "username": "alice", "password": "wrong12" }),
        json!({ "username": "nobody", "password": "secret1" }),
    ] {
        let res = client.post(srv.url("/auth/login")).json(&body).send().await.unwrap();
        assert_eq!(error_of(res).await, (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    }

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "username": "alice", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(client.get(srv.url("/auth/me")).send().await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    let res = client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth-token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn layaway_lifecycle_drives_status() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    let item = create_item(&srv, &client, item_body(5)).await;
    assert_eq!(item["status"], "Available");
    assert_eq!(item["reserved"], 0);
    let id = item["id"].as_str().unwrap().to_string();

    let added = add_layaway(&srv, &client, &id).await;
    let item = &added["data"]["item"];
    assert_eq!(item["reserved"], 1);
    assert_eq!(item["available"], 5);
    assert_eq!(item["status"], "Partially Reserved");
    let layaway_id = added["data"]["layaway"]["id"].as_str().unwrap().to_string();
    assert_eq!(added["data"]["layaway"]["customerName"], "Jane Doe");

    let mut update = item_body(0);
    update["notes"] = json!("floor model sold");
    let res = client
        .put(srv.url(&format!("/inventory/{id}")))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["item"]["status"], "Out of Stock");
    assert_eq!(body["data"]["item"]["reserved"], 1);

    let res = client
        .delete(srv.url(&format!("/inventory/{id}/layaway/{layaway_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["item"]["reserved"], 0);
    assert_eq!(body["data"]["item"]["status"], "Out of Stock");
    assert_eq!(body["data"]["item"]["layaways"], json!([]));

    let res = client
        .delete(srv.url(&format!("/inventory/{id}/layaway/{layaway_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::NOT_FOUND, "Layaway reservation not found".to_string())
    );
}

#[tokio::test]
async fn single_unit_stays_low_stock_with_reservations() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    let item = create_item(&srv, &client, item_body(1)).await;
    assert_eq!(item["status"], "Low Stock");
    let id = item["id"].as_str().unwrap().to_string();

    add_layaway(&srv, &client, &id).await;
    let second = add_layaway(&srv, &client, &id).await;
    assert_eq!(second["data"]["item"]["reserved"], 2);
    assert_eq!(second["data"]["item"]["status"], "Low Stock");
}

#[tokio::test]
async fn item_validation_errors() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    for available in [1_000_000, -1] {
        let res = client
            .post(srv.url("/inventory"))
            .json(&item_body(available))
            .send()
            .await
            .unwrap();
        assert_eq!(
            error_of(res).await,
            (
                StatusCode::BAD_REQUEST,
                "Available quantity must be between 0 and 999,999".to_string()
            )
        );
    }

    let res = client
        .post(srv.url("/inventory"))
        .json(&json!({ "itemNumber": "A-1", "description": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "All required fields must be provided".to_string())
    );

    let item = create_item(&srv, &client, item_body(3)).await;
    let id = item["id"].as_str().unwrap();
    let res = client
        .post(srv.url(&format!("/inventory/{id}/layaway")))
        .json(&json!({ "customerName": "Jane" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Customer name and phone are required".to_string())
    );

    let gone = create_item(&srv, &client, item_body(2)).await;
    let gone_id = gone["id"].as_str().unwrap();
    client
        .delete(srv.url(&format!("/inventory/{gone_id}")))
        .send()
        .await
        .unwrap();
    let res = client
        .post(srv.url(&format!("/inventory/{gone_id}/layaway")))
        .json(&json!({ "customerName": "", "phone": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Customer name and phone are required".to_string())
    );

    let res = client.get(srv.url("/inventory/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "invalid_id");
}

#[tokio::test]
async fn items_are_scoped_to_their_owner() {
    let srv = TestServer::spawn().await;
    let (alice, _) = srv.signed_up("alice").await;
    let (bob, _) = srv.signed_up("bob").await;

    let item = create_item(&srv, &alice, item_body(4)).await;
    let id = item["id"].as_str().unwrap();

    let res = bob.get(srv.url(&format!("/inventory/{id}"))).send().await.unwrap();
    assert_eq!(error_of(res).await, (StatusCode::NOT_FOUND, "Item not found".to_string()));

    let res = bob.delete(srv.url(&format!("/inventory/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let listed: Value = bob.get(srv.url("/inventory")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed["data"]["items"], json!([]));

    let res = alice.delete(srv.url(&format!("/inventory/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = alice.get(srv.url(&format!("/inventory/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_filters_and_stats() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    create_item(&srv, &client, item_body(5)).await;
    let lamp = create_item(
        &srv,
        &client,
        json!({
            "itemNumber": "LAMP-7",
            "description": "Brass floor lamp",
            "available": 1,
            "vendor": "Coaster",
            "warehouse": "Small Warehouse",
        }),
    )
    .await;
    create_item(
        &srv,
        &client,
        json!({
            "itemNumber": "BED-2",
            "description": "Queen bed",
            "available": 0,
            "vendor": "Coaster",
            "warehouse": "Big Warehouse",
        }),
    )
    .await;
    add_layaway(&srv, &client, lamp["id"].as_str().unwrap()).await;

    let list = |query: &'static str| {
        let client = client.clone();
        let url = srv.url(&format!("/inventory{query}"));
        async move {
            let body: Value = client.get(url).send().await.unwrap().json().await.unwrap();
            body["data"]["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|i| i["itemNumber"].as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(list("").await, vec!["BED-2", "LAMP-7", "SOFA-100"]);
    assert_eq!(list("?search=BRASS").await, vec!["LAMP-7"]);
    assert_eq!(list("?vendor=Coaster&warehouse=Big%20Warehouse").await, vec!["BED-2"]);
    assert_eq!(list("?search=&vendor=").await.len(), 3);
    assert!(list("?search=.*").await.is_empty());

    let stats: Value = client
        .get(srv.url("/inventory/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        stats["data"]["stats"],
        json!({ "totalItems": 3, "inStock": 2, "reserved": 1, "lowStock": 1 })
    );
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    let item = create_item(&srv, &client, item_body(5)).await;
    let id = item["id"].as_str().unwrap().to_string();
    let seen = item["version"].as_u64().unwrap();

    add_layaway(&srv, &client, &id).await;

    let mut update = item_body(7);
    update["version"] = json!(seen);
    let res = client
        .put(srv.url(&format!("/inventory/{id}")))
        .json(&update)
        .send()
        .await
        .unwrap();
    let (status, _) = error_of(res).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let current: Value = client
        .get(srv.url(&format!("/inventory/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["data"]["item"]["available"], 5);
    assert_eq!(current["data"]["item"]["reserved"], 1);

    update["version"] = current["data"]["item"]["version"].clone();
    let res = client
        .put(srv.url(&format!("/inventory/{id}")))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn vendors_and_warehouses_merge_defaults_with_custom_entries() {
    let srv = TestServer::spawn().await;
    let (client, _) = srv.signed_up("alice").await;

    let res = client
        .post(srv.url("/vendors"))
        .json(&json!({ "name": "  Acme  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["vendor"]["name"], "Acme");
    assert_eq!(body["data"]["vendor"]["isDefault"], false);

    let body: Value = client.get(srv.url("/vendors")).send().await.unwrap().json().await.unwrap();
    let names: Vec<&str> = body["data"]["vendors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ashley", "Nationwide", "Coaster", "Global", "Acme"]);
    assert_eq!(body["data"]["vendors"][0]["isDefault"], true);

    let conflicts = [
        ("/vendors", "Ashley", "This vendor already exists as a default option"),
        ("/vendors", "Acme", "Vendor already exists"),
        ("/warehouses", "Big Warehouse", "This warehouse already exists as a default option"),
    ];
    for (path, name, message) in conflicts {
        let res = client.post(srv.url(path)).json(&json!({ "name": name })).send().await.unwrap();
        assert_eq!(error_of(res).await, (StatusCode::CONFLICT, message.to_string()));
    }

    let res = client
        .post(srv.url("/warehouses"))
        .json(&json!({ "name": " " }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::BAD_REQUEST, "Warehouse name is required".to_string())
    );

    let (bob, _) = srv.signed_up("bob").await;
    let body: Value = bob.get(srv.url("/vendors")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["vendors"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn admin_manages_users() {
    let srv = TestServer::spawn().await;
    let (admin, _) = srv.signed_up("root").await;
    let (clerk, clerk_body) = srv.signed_up("clerk").await;
    let clerk_id = clerk_body["data"]["user"]["id"].as_str().unwrap().to_string();

    let res = clerk.get(srv.url("/admin/users")).send().await.unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::FORBIDDEN, "Unauthorized - Admin access required".to_string())
    );

    create_item(&srv, &clerk, item_body(2)).await;
    clerk
        .post(srv.url("/warehouses"))
        .json(&json!({ "name": "Annex" }))
        .send()
        .await
        .unwrap();

    let body: Value = admin.get(srv.url("/admin/users")).send().await.unwrap().json().await.unwrap();
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let root = users.iter().find(|u| u["username"] == "root").unwrap();
    let listed_clerk = users.iter().find(|u| u["username"] == "clerk").unwrap();
    assert_eq!(listed_clerk["itemCount"], 1);
    assert!(listed_clerk.get("passwordHash").is_none());

    let root_id = root["id"].as_str().unwrap();
    let res = admin
        .delete(srv.url(&format!("/admin/users/{root_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(
        error_of(res).await,
        (StatusCode::FORBIDDEN, "Cannot delete admin users".to_string())
    );

    // Promotion applies to the clerk's existing session immediately.
    let res = admin
        .post(srv.url(&format!("/admin/users/{clerk_id}/toggle-admin")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["message"], "User promoted to admin");
    assert_eq!(clerk.get(srv.url("/admin/users")).send().await.unwrap().status(), StatusCode::OK);

    let body: Value = admin
        .post(srv.url(&format!("/admin/users/{clerk_id}/toggle-admin")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["message"], "User demoted from admin");

    let res = admin
        .delete(srv.url(&format!("/admin/users/{clerk_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The deleted user's session no longer resolves.
    let res = clerk.get(srv.url("/inventory")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = admin
        .delete(srv.url(&format!("/admin/users/{clerk_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(error_of(res).await, (StatusCode::NOT_FOUND, "User not found".to_string()));

    // Re-registering the name starts from an empty inventory and catalog.
    let (again, _) = srv.signed_up("clerk").await;
    let listed: Value = again.get(srv.url("/inventory")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed["data"]["items"], json!([]));
    let warehouses: Value = again.get(srv.url("/warehouses")).send().await.unwrap().json().await.unwrap();
    assert_eq!(warehouses["data"]["warehouses"].as_array().unwrap().len(), 2);
}
