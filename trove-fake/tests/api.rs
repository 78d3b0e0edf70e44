use serde_json::{json, Value};
use trove_fake::{spawn, FakeConfig};

async fn authed_get(http: &reqwest::Client, url: &str, token: &str) -> reqwest::Response {
    http.get(url)
        .header("X-Auth-Token", token)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn tenant_api_requires_the_issued_token() {
    let fake = spawn(FakeConfig::default()).await.unwrap();
    let http = reqwest::Client::new();

    let resp = http
        .get(format!("{}/instances", fake.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = http
        .get(format!("{}/instances", fake.base_url))
        .header("X-Auth-Token", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = http
        .get(format!("{}/instances", fake.base_url))
        .header("X-Auth-Token", &fake.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "instances": [] }));
}

#[tokio::test]
async fn versions_are_public() {
    let fake = spawn(FakeConfig::default()).await.unwrap();
    let body: Value = reqwest::get(format!("http://{}/", fake.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["versions"][0]["id"], "v1.0");
    assert_eq!(body["versions"][0]["status"], "CURRENT");
}

#[tokio::test]
async fn password_auth_returns_token_and_catalog() {
    let fake = spawn(FakeConfig::default()).await.unwrap();
    let http = reqwest::Client::new();
    let request = |password: &str| {
        json!({"auth": {
            "identity": {"methods": ["password"], "password": {"user": {
                "name": "demo", "domain": {"name": "Default"}, "password": password
            }}},
            "scope": {"project": {"name": "demo", "domain": {"name": "Default"}}}
        }})
    };

    let resp = http
        .post(format!("{}/auth/tokens", fake.auth_url))
        .json(&request("secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers()["X-Subject-Token"], "fake-token");
    let body: Value = resp.json().await.unwrap();
    let endpoints = body["token"]["catalog"][0]["endpoints"].as_array().unwrap();
    assert!(endpoints
        .iter()
        .any(|e| e["interface"] == "public" && e["url"] == fake.base_url.as_str()));

    let resp = http
        .post(format!("{}/auth/tokens", fake.auth_url))
        .json(&request("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn instance_builds_then_goes_away_after_delete() {
    let fake = spawn(FakeConfig {
        settle_polls: 1,
        ..FakeConfig::default()
    })
    .await
    .unwrap();
    let http = reqwest::Client::new();
    let url = |path: &str| format!("{}/{}", fake.base_url, path);

    let created: Value = http
        .post(url("instances"))
        .header("X-Auth-Token", &fake.token)
        .json(&json!({"instance": {
            "name": "db", "flavorRef": "1", "volume": {"size": 1},
            "datastore": {"type": "mysql"}
        }}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["instance"]["status"], "BUILD");
    let id = created["instance"]["id"].as_str().unwrap().to_string();

    let show_url = url(&format!("instances/{}", id));
    let body: Value = authed_get(&http, &show_url, &fake.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["instance"]["status"], "ACTIVE");
    assert_eq!(body["instance"]["ip"][0], "127.0.0.1");

    let resp = http
        .delete(url(&format!("instances/{}", id)))
        .header("X-Auth-Token", &fake.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let resp = authed_get(&http, &show_url, &fake.token).await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["itemNotFound"]["code"], 404);
}

#[tokio::test]
async fn only_restart_is_an_accepted_action() {
    let fake = spawn(FakeConfig {
        settle_polls: 1,
        ..FakeConfig::default()
    })
    .await
    .unwrap();
    let http = reqwest::Client::new();
    let url = |path: &str| format!("{}/{}", fake.base_url, path);

    let created: Value = http
        .post(url("instances"))
        .header("X-Auth-Token", &fake.token)
        .json(&json!({"instance": {
            "name": "db", "flavorRef": "1", "volume": {"size": 1},
            "datastore": {"type": "mysql"}
        }}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["instance"]["id"].as_str().unwrap().to_string();
    let show_url = url(&format!("instances/{}", id));
    let body: Value = authed_get(&http, &show_url, &fake.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["instance"]["status"], "ACTIVE");

    let action = |payload: Value| {
        http.post(url(&format!("instances/{}/action", id)))
            .header("X-Auth-Token", &fake.token)
            .json(&payload)
            .send()
    };
    let resp = action(json!({"resize": {"volume": {"size": 8_589_934_592u64}}}))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["badRequest"]["message"], "Unknown action 'resize'.");

    let resp = action(json!({"restart": {}})).await.unwrap();
    assert_eq!(resp.status(), 202);
}
