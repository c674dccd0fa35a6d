//! End-to-end tests of the session gate: login, role-gated routes and logout,
//! against the real router served on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use clinic::error::{AppError, AppResult};
use clinic::identity::{MemorySessionStore, Role, Session, SessionStore, StaticCredentials};
use clinic::server::{router, AppState};
use clinic::storage::{PatientInput, SharedStore};

struct TestServer {
    base: String,
    state: AppState,
    client: Client,
}

impl TestServer {
    async fn start() -> Result<Self> {
        Self::start_with(AppState::new(
            Arc::new(MemorySessionStore::default()),
            Arc::new(StaticCredentials::development()),
            SharedStore::new(),
        ))
        .await
    }

    async fn start_with(state: AppState) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { base: format!("http://{}", addr), state, client: Client::new() })
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

    fn seed_patient(&self, name: &str) -> i64 {
        let input = PatientInput { name: name.into(), age: 30, gender: "male".into(), notes: "No notes".into() };
        self.state.store.0.lock().create(input).expect("seed patient").id
    }

    /// Log in and return the `name=value` pair to send back as a Cookie header.
    async fn login(&self, username: &str, password: &str, role: &str) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": password, "role": role }))
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(anyhow!("login failed with {}", resp.status()));
        }
        let set_cookie = resp
            .headers()
            .get(SET_COOKIE)
            .ok_or_else(|| anyhow!("no Set-Cookie on login"))?
            .to_str()?
            .to_string();
        let pair = set_cookie.split(';').next().unwrap_or_default().trim().to_string();
        Ok(pair)
    }

    async fn get(&self, path: &str, cookie: Option<&str>) -> Result<reqwest::Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(c) = cookie { req = req.header(COOKIE, c); }
        Ok(req.send().await?)
    }
}

fn token_of(cookie_pair: &str) -> &str {
    cookie_pair.split_once('=').map(|(_, v)| v).unwrap_or_default()
}

/// Session backend whose every call fails.
struct UnreachableStore;

impl SessionStore for UnreachableStore {
    fn create(&self, _: &str, _: Role) -> AppResult<Session> {
        Err(AppError::dependency("down", "backend unreachable"))
    }
    fn load(&self, _: &str) -> AppResult<Option<Session>> {
        Err(AppError::dependency("down", "backend unreachable"))
    }
    fn delete(&self, _: &str) -> AppResult<bool> {
        Err(AppError::dependency("down", "backend unreachable"))
    }
    fn sweep_expired(&self) -> usize { 0 }
    fn len(&self) -> usize { 0 }
    fn ttl(&self) -> chrono::Duration { chrono::Duration::seconds(1) }
}

#[tokio::test]
async fn every_registry_principal_can_log_in_with_its_role() -> Result<()> {
    let srv = TestServer::start().await?;
    for (u, p, role) in [("receptionist1", "reception123", Role::Receptionist), ("doctor1", "doctor123", Role::Doctor)] {
        let cookie = srv.login(u, p, role.as_str()).await?;
        let session = srv.state.sessions.load(token_of(&cookie))?.expect("session stored");
        assert_eq!(session.role, role);
        assert_eq!(session.username, u);
    }
    Ok(())
}

#[tokio::test]
async fn login_sets_hardened_cookie() -> Result<()> {
    let srv = TestServer::start().await?;
    let resp = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "username": "doctor1", "password": "doctor123", "role": "doctor" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers().get(SET_COOKIE).expect("cookie").to_str()?.to_string();
    for flag in ["clinic_session=", "HttpOnly", "Secure", "SameSite=Lax", "Path=/", "Max-Age=3600"] {
        assert!(set_cookie.contains(flag), "missing {flag} in {set_cookie}");
    }
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Login successful");
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_401_and_create_no_session() -> Result<()> {
    let srv = TestServer::start().await?;
    let bad = [
        json!({ "username": "nobody", "password": "reception123", "role": "receptionist" }),
        json!({ "username": "receptionist1", "password": "wrong", "role": "receptionist" }),
        json!({ "username": "receptionist1", "password": "reception123", "role": "doctor" }),
        json!({ "username": "doctor1", "password": "doctor123", "role": "admin" }),
    ];
    for body in bad {
        let resp = srv.client.post(srv.url("/login")).json(&body).send().await?;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{body}");
        assert!(resp.headers().get(SET_COOKIE).is_none());
        let v: Value = resp.json().await?;
        assert_eq!(v["error"], "Invalid credentials");
    }
    assert_eq!(srv.state.sessions.len(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_400() -> Result<()> {
    let srv = TestServer::start().await?;
    let missing_role = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "username": "doctor1", "password": "doctor123" }))
        .send()
        .await?;
    assert_eq!(missing_role.status(), StatusCode::BAD_REQUEST);

    let not_json = srv
        .client
        .post(srv.url("/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    let v: Value = not_json.json().await?;
    assert_eq!(v["error"], "Invalid input");
    assert_eq!(srv.state.sessions.len(), 0);
    Ok(())
}

#[tokio::test]
async fn gated_routes_without_cookie_are_401() -> Result<()> {
    let srv = TestServer::start().await?;
    let id = srv.seed_patient("John Doe");
    let c = &srv.client;
    let requests = vec![
        c.get(srv.url("/receptionist/patients")),
        c.post(srv.url("/receptionist/patients")).json(&json!({ "name": "x", "age": 1, "gender": "f" })),
        c.put(srv.url(&format!("/receptionist/patients/{id}"))).json(&json!({ "name": "x", "age": 1, "gender": "f" })),
        c.delete(srv.url(&format!("/receptionist/patients/{id}"))),
        c.get(srv.url("/doctor/patients")),
        c.put(srv.url(&format!("/doctor/patients/{id}/notes"))).json(&json!({ "notes": "x" })),
    ];
    for req in requests {
        let resp = req.send().await?;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let v: Value = resp.json().await?;
        assert_eq!(v["error"], "Unauthorized: no active session");
    }
    // nothing downstream ran
    assert_eq!(srv.state.store.0.lock().get(id)?.notes, "No notes");
    Ok(())
}

#[tokio::test]
async fn forged_cookie_is_401() -> Result<()> {
    let srv = TestServer::start().await?;
    let resp = srv.get("/doctor/patients", Some("clinic_session=forged-token")).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn receptionist_lists_patients_but_is_forbidden_on_doctor_routes() -> Result<()> {
    let srv = TestServer::start().await?;
    srv.seed_patient("John Doe");
    let cookie = srv.login("receptionist1", "reception123", "receptionist").await?;

    let resp = srv.get("/receptionist/patients", Some(&cookie)).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<Value> = resp.json().await?;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "John Doe");

    let resp = srv.get("/doctor/patients", Some(&cookie)).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let v: Value = resp.json().await?;
    assert_eq!(v["error"], "Forbidden: insufficient permissions");
    Ok(())
}

#[tokio::test]
async fn doctor_is_forbidden_on_receptionist_routes() -> Result<()> {
    let srv = TestServer::start().await?;
    let cookie = srv.login("doctor1", "doctor123", "doctor").await?;
    let resp = srv
        .client
        .post(srv.url("/receptionist/patients"))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "Jane", "age": 40, "gender": "female" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(srv.state.store.0.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn doctor_updates_notes() -> Result<()> {
    let srv = TestServer::start().await?;
    let id = srv.seed_patient("John Doe");
    let cookie = srv.login("doctor1", "doctor123", "doctor").await?;
    let resp = srv
        .client
        .put(srv.url(&format!("/doctor/patients/{id}/notes")))
        .header(COOKIE, &cookie)
        .json(&json!({ "notes": "x" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = resp.json().await?;
    assert_eq!(v["notes"], "x");
    assert_eq!(srv.state.store.0.lock().get(id)?.notes, "x");
    Ok(())
}

#[tokio::test]
async fn receptionist_crud_round() -> Result<()> {
    let srv = TestServer::start().await?;
    let cookie = srv.login("receptionist1", "reception123", "receptionist").await?;

    let resp = srv
        .client
        .post(srv.url("/receptionist/patients"))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "John Doe", "age": 30, "gender": "male", "notes": "No notes" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = resp.json().await?;
    let id = created["id"].as_i64().expect("id");

    let resp = srv
        .client
        .put(srv.url(&format!("/receptionist/patients/{id}")))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "John Doe", "age": 31, "gender": "male" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await?;
    assert_eq!(updated["age"], 31);

    let resp = srv
        .client
        .put(srv.url("/receptionist/patients/abc"))
        .header(COOKIE, &cookie)
        .json(&json!({ "name": "John Doe", "age": 31, "gender": "male" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = srv
        .client
        .delete(srv.url(&format!("/receptionist/patients/{id}")))
        .header(COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = srv
        .client
        .delete(srv.url(&format!("/receptionist/patients/{id}")))
        .header(COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn logout_invalidates_session() -> Result<()> {
    let srv = TestServer::start().await?;
    let cookie = srv.login("doctor1", "doctor123", "doctor").await?;
    assert_eq!(srv.get("/doctor/patients", Some(&cookie)).await?.status(), StatusCode::OK);

    let resp = srv.client.post(srv.url("/logout")).header(COOKIE, &cookie).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp.headers().get(SET_COOKIE).expect("clearing cookie").to_str()?.to_string();
    assert!(cleared.contains("Max-Age=0"));

    assert!(srv.state.sessions.load(token_of(&cookie))?.is_none());
    assert_eq!(srv.get("/doctor/patients", Some(&cookie)).await?.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_without_session_still_succeeds() -> Result<()> {
    let srv = TestServer::start().await?;
    let resp = srv.client.post(srv.url("/logout")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = resp.json().await?;
    assert_eq!(v["message"], "Logged out successfully");
    Ok(())
}

#[tokio::test]
async fn concurrent_logins_get_distinct_sessions() -> Result<()> {
    let srv = Arc::new(TestServer::start().await?);
    let mut handles = Vec::new();
    for _ in 0..16 {
        let srv = srv.clone();
        handles.push(tokio::spawn(async move { srv.login("doctor1", "doctor123", "doctor").await }));
    }
    let mut tokens = std::collections::HashSet::new();
    for h in handles {
        assert!(tokens.insert(h.await??));
    }
    assert_eq!(srv.state.sessions.len(), 16);
    Ok(())
}

#[tokio::test]
async fn background_sweeper_evicts_expired_sessions() -> Result<()> {
    let state = AppState::in_memory(chrono::Duration::seconds(1));
    state.sessions.create("doctor1", Role::Doctor)?;
    state.sessions.create("receptionist1", Role::Receptionist)?;
    assert_eq!(state.sessions.len(), 2);

    let sweeper = clinic::server::spawn_session_sweeper(state.sessions.clone(), std::time::Duration::from_millis(50));
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    assert_eq!(state.sessions.len(), 0);
    sweeper.abort();
    Ok(())
}

#[tokio::test]
async fn expired_session_is_rejected_by_gate() -> Result<()> {
    let srv = TestServer::start_with(AppState::in_memory(chrono::Duration::seconds(1))).await?;
    let cookie = srv.login("doctor1", "doctor123", "doctor").await?;
    assert_eq!(srv.get("/doctor/patients", Some(&cookie)).await?.status(), StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    let resp = srv.get("/doctor/patients", Some(&cookie)).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Unauthorized: no active session");
    assert_eq!(srv.state.sessions.len(), 0);
    Ok(())
}

#[tokio::test]
async fn session_backend_failure_in_gate_is_opaque() -> Result<()> {
    let srv = TestServer::start_with(AppState::new(
        Arc::new(UnreachableStore),
        Arc::new(StaticCredentials::development()),
        SharedStore::new(),
    ))
    .await?;
    let resp = srv.get("/doctor/patients", Some("clinic_session=t")).await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await?;
    assert_eq!(body["error"], "Internal server error");
    Ok(())
}
