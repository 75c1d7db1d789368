use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::files::Folder;
use crate::middleware::{load_identity, require_admin, require_auth, require_developer};
use crate::state::AppState;
use crate::{approvals, auth, courses, notifications, profile, settings};

/// Build the full application router.
///
/// Guard layers are stacked per group; `require_auth` is the outer one so an
/// anonymous caller is always sent to the login page first.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let public = Router::new()
        .route("/", get(courses::index))
        .route("/health", get(health))
        .route("/courses", get(courses::list_courses))
        .route("/course/{id}", get(courses::view_course))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", post(auth::login));

    let authenticated = Router::new()
        .route("/logout", get(auth::logout))
        .route("/profile", get(profile::get_profile).post(profile::update_profile))
        .route("/profile/upload", post(profile::upload_profile_image))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read/{id}", get(notifications::mark_read))
        .route_layer(from_fn(require_auth));

    let developer = Router::new()
        .route("/developer/requests", get(approvals::developer_requests))
        .route("/developer/approve/{id}", get(approvals::developer_approve))
        .route("/developer/reject/{id}", get(approvals::developer_reject))
        .route_layer(from_fn(require_developer))
        .route_layer(from_fn(require_auth));

    let admin = Router::new()
        .route("/add-course", post(courses::add_course))
        .route("/upload-course/{id}", post(courses::upload_course))
        .route("/admin/requests", get(approvals::admin_requests))
        .route("/admin/approve/{id}", get(approvals::admin_approve))
        .route("/admin/reject/{id}", get(approvals::admin_reject))
        .route("/admin/settings", get(settings::get_settings).post(settings::update_settings))
        .route("/admin/settings/logo", post(settings::upload_logo))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(require_auth));

    let static_files = Router::new()
        .nest_service("/uploads", ServeDir::new(state.storage.dir(Folder::Courses)))
        .nest_service("/profile-images", ServeDir::new(state.storage.dir(Folder::ProfileImages)))
        .nest_service("/settings-assets", ServeDir::new(state.storage.dir(Folder::SettingsAssets)));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(developer)
        .merge(admin)
        .merge(static_files)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(from_fn_with_state(state.clone(), load_identity))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use academia_db::Database;
    use academia_db::models::NewUser;
    use academia_types::models::Role;

    use super::*;
    use crate::bootstrap::ensure_developer;
    use crate::files::Storage;
    use crate::middleware::UNREAD_HEADER;
    use crate::password::hash_password;
    use crate::state::{AppStateInner, RegistrationMode};

    const PASSWORD: &str = "secret123";

    struct TestApp {
        app: Router,
        state: AppState,
        _dir: TempDir,
    }

    struct Reply {
        status: StatusCode,
        headers: HeaderMap,
        body: Value,
        raw: Vec<u8>,
    }

    async fn test_app(mode: RegistrationMode) -> TestApp {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(
            dir.path().join("uploads"),
            dir.path().join("profile_images"),
            dir.path().join("settings"),
        )
        .await
        .unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage,
            registration: mode,
            session_days: 30,
        });
        TestApp {
            app: router(state.clone(), 10 * 1024 * 1024),
            state,
            _dir: dir,
        }
    }

    impl TestApp {
        async fn send(&self, req: Request<Body>) -> Reply {
            let res = self.app.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let headers = res.headers().clone();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            Reply {
                status,
                headers,
                body,
                raw: bytes.to_vec(),
            }
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
            let mut req = Request::builder().method(Method::GET).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            self.send(req.body(Body::empty()).unwrap()).await
        }

        async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
            let mut req = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            self.send(req.body(Body::from(body.to_string())).unwrap()).await
        }

        async fn upload(&self, uri: &str, token: &str, field: &str, filename: &str, data: &[u8]) -> Reply {
            let boundary = "academia-test-boundary";
            let mut body = Vec::new();
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

            let req = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
                .body(Body::from(body))
                .unwrap();
            self.send(req).await
        }

        fn category_id(&self, role: Role) -> i64 {
            self.state.db.get_category_by_role(role).unwrap().unwrap().id
        }

        async fn register(&self, name: &str, email: &str, role: Role) -> Reply {
            let category_id = self.category_id(role);
            self.post_json(
                "/register",
                None,
                json!({ "name": name, "email": email, "password": PASSWORD, "category_id": category_id }),
            )
            .await
        }

        async fn login(&self, email: &str, password: &str) -> Reply {
            self.post_json("/login", None, json!({ "email": email, "password": password })).await
        }

        async fn token(&self, email: &str) -> String {
            let reply = self.login(email, PASSWORD).await;
            assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.body);
            reply.body["token"].as_str().unwrap().to_string()
        }

        fn seed_developer(&self) -> i64 {
            ensure_developer(&self.state.db, "dev@edu.local", PASSWORD).unwrap()
        }

        fn seed_active_admin(&self, email: &str) -> i64 {
            let hash = hash_password(PASSWORD).unwrap();
            self.state
                .db
                .ensure_user(&NewUser {
                    name: "Active Admin",
                    email,
                    password_hash: &hash,
                    category_id: Some(self.category_id(Role::Admin)),
                    is_admin: true,
                    is_developer: false,
                    is_active: true,
                    pending_approval: false,
                })
                .unwrap()
        }

        fn notification_count(&self) -> i64 {
            self.state
                .db
                .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM notifications", [], |r| r.get(0))?))
                .unwrap()
        }
    }

    fn location(reply: &Reply) -> &str {
        reply.headers[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn student_registration_is_active_at_once() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_developer();

        let reply = t.register("Sara", "sara@edu.local", Role::Student).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["user"]["is_active"], true);
        assert_eq!(reply.body["user"]["pending_approval"], false);
        assert_eq!(reply.body["user"]["role"], "student");
        assert!(reply.body.get("token").is_none());
        assert_eq!(t.notification_count(), 0);

        t.token("sara@edu.local").await;
    }

    #[tokio::test]
    async fn missing_category_defaults_to_student() {
        let t = test_app(RegistrationMode::Approval).await;
        let reply = t
            .post_json(
                "/register",
                None,
                json!({ "name": "Omar", "email": "omar@edu.local", "password": PASSWORD }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["user"]["role"], "student");

        let unknown = t
            .post_json(
                "/register",
                None,
                json!({ "name": "Omar", "email": "omar2@edu.local", "password": PASSWORD, "category_id": 999 }),
            )
            .await;
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_registration_notifies_the_developer() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_developer();

        let reply = t.register("Mona", "mona@edu.local", Role::Admin).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["user"]["is_admin"], true);
        assert_eq!(reply.body["user"]["is_active"], false);
        assert_eq!(reply.body["user"]["pending_approval"], true);
        assert_eq!(t.notification_count(), 1);

        let dev = t.token("dev@edu.local").await;
        let notes = t.get("/notifications", Some(&dev)).await;
        assert_eq!(notes.status, StatusCode::OK);
        assert_eq!(notes.body["notifications"][0]["message"], "New admin request: Mona");
        assert_eq!(notes.headers[&UNREAD_HEADER], "1");

        let pending = t.login("mona@edu.local", PASSWORD).await;
        assert_eq!(pending.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_registration_without_developer_sends_nothing() {
        let t = test_app(RegistrationMode::Approval).await;

        let reply = t.register("Mona", "mona@edu.local", Role::Admin).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["user"]["pending_approval"], true);
        assert_eq!(t.notification_count(), 0);
    }

    #[tokio::test]
    async fn teacher_request_goes_to_an_active_admin() {
        let t = test_app(RegistrationMode::Approval).await;
        let admin = t.seed_active_admin("boss@edu.local");

        t.register("Ali", "ali@edu.local", Role::Teacher).await;
        let notes = t.state.db.list_notifications(admin).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "New teacher request: Ali");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;

        let again = t.register("Sara Two", "SARA@edu.local", Role::Student).await;
        assert_eq!(again.status, StatusCode::BAD_REQUEST);
        assert_eq!(again.body["level"], "danger");
    }

    #[tokio::test]
    async fn rejecting_a_pending_admin_deletes_it() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_developer();
        let id = t.register("Mona", "mona@edu.local", Role::Admin).await.body["user"]["id"]
            .as_i64()
            .unwrap();
        let dev = t.token("dev@edu.local").await;

        let listed = t.get("/developer/requests", Some(&dev)).await;
        assert_eq!(listed.body["pending"][0]["id"], id);

        let reply = t.get(&format!("/developer/reject/{id}"), Some(&dev)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(location(&reply), "/developer/requests");
        assert!(t.state.db.get_user_by_id(id).unwrap().is_none());

        let again = t.get(&format!("/developer/reject/{id}"), Some(&dev)).await;
        assert_eq!(again.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn developer_approves_admin_who_can_then_log_in() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_developer();
        let id = t.register("Mona", "mona@edu.local", Role::Admin).await.body["user"]["id"]
            .as_i64()
            .unwrap();
        let dev = t.token("dev@edu.local").await;

        let reply = t.get(&format!("/developer/approve/{id}"), Some(&dev)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.body["level"], "success");

        let admin = t.token("mona@edu.local").await;
        assert_eq!(t.get("/admin/requests", Some(&admin)).await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn approving_a_teacher_twice_is_harmless() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_active_admin("boss@edu.local");
        let id = t.register("Ali", "ali@edu.local", Role::Teacher).await.body["user"]["id"]
            .as_i64()
            .unwrap();
        let admin = t.token("boss@edu.local").await;

        for _ in 0..2 {
            let reply = t.get(&format!("/admin/approve/{id}"), Some(&admin)).await;
            assert_eq!(reply.status, StatusCode::SEE_OTHER);
            assert_eq!(reply.body["level"], "success");
        }

        let teacher = t.state.db.get_user_by_id(id).unwrap().unwrap();
        assert!(teacher.is_active);
        assert!(!teacher.pending_approval);
    }

    #[tokio::test]
    async fn reviewers_cannot_cross_tiers() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_developer();
        t.seed_active_admin("boss@edu.local");
        let pending_admin = t.register("Mona", "mona@edu.local", Role::Admin).await.body["user"]["id"]
            .as_i64()
            .unwrap();
        let teacher = t.register("Ali", "ali@edu.local", Role::Teacher).await.body["user"]["id"]
            .as_i64()
            .unwrap();
        let admin = t.token("boss@edu.local").await;
        let dev = t.token("dev@edu.local").await;

        let reply = t.get(&format!("/admin/reject/{pending_admin}"), Some(&admin)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.body["level"], "warning");
        assert!(t.state.db.get_user_by_id(pending_admin).unwrap().is_some());

        let reply = t.get(&format!("/developer/approve/{teacher}"), Some(&dev)).await;
        assert_eq!(reply.body["level"], "warning");
        assert!(!t.state.db.get_user_by_id(teacher).unwrap().unwrap().is_active);

        let listed = t.get("/admin/requests", Some(&admin)).await;
        let pending = listed.body["pending"].as_array().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0]["id"], teacher);
    }

    #[tokio::test]
    async fn guards_redirect_instead_of_failing() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let student = t.token("sara@edu.local").await;

        let anon = t.get("/notifications", None).await;
        assert_eq!(anon.status, StatusCode::SEE_OTHER);
        assert_eq!(location(&anon), "/login");

        let not_admin = t.get("/admin/requests", Some(&student)).await;
        assert_eq!(not_admin.status, StatusCode::SEE_OTHER);
        assert_eq!(location(&not_admin), "/");

        let not_dev = t.get("/developer/requests", Some(&student)).await;
        assert_eq!(location(&not_dev), "/");

        let bogus = t.get("/profile", Some("not-a-session")).await;
        assert_eq!(location(&bogus), "/login");
    }

    #[tokio::test]
    async fn course_upload_checks_the_extension() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_active_admin("boss@edu.local");
        let admin = t.token("boss@edu.local").await;

        let created = t
            .post_json(
                "/add-course",
                Some(&admin),
                json!({ "title": "Intro to Rust", "description": "basics", "category": "Programming" }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
        let id = created.body["id"].as_i64().unwrap();

        let rejected = t.upload(&format!("/upload-course/{id}"), &admin, "file", "setup.exe", b"MZ").await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert!(t.state.db.get_course(id).unwrap().unwrap().file_url.is_none());

        let accepted = t
            .upload(&format!("/upload-course/{id}"), &admin, "file", "week 1.pdf", b"%PDF-1.7")
            .await;
        assert_eq!(accepted.status, StatusCode::OK);
        assert_eq!(accepted.body["filename"], "week_1.pdf");
        assert_eq!(
            t.state.db.get_course(id).unwrap().unwrap().file_url.as_deref(),
            Some("week_1.pdf")
        );

        let served = t.get(&format!("/uploads/{id}/week_1.pdf"), None).await;
        assert_eq!(served.status, StatusCode::OK);
        assert_eq!(served.raw, b"%PDF-1.7");

        let missing = t.upload("/upload-course/999", &admin, "file", "a.pdf", b"x").await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn every_view_is_logged() {
        let t = test_app(RegistrationMode::Approval).await;
        let admin_id = t.seed_active_admin("boss@edu.local");
        let course = t.state.db.insert_course("Algebra", "", "Math", admin_id).unwrap();
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let student = t.token("sara@edu.local").await;

        let first = t.get(&format!("/course/{course}"), Some(&student)).await;
        assert_eq!(first.status, StatusCode::OK);
        let prior = first.body["visits_count"].as_i64().unwrap();

        t.get(&format!("/course/{course}"), Some(&student)).await;
        let third = t.get(&format!("/course/{course}"), Some(&student)).await;
        assert_eq!(third.body["visits_count"].as_i64().unwrap(), prior + 2);
        assert_eq!(third.body["recent_visits"][0]["user_name"], "Sara");

        let anonymous = t.get(&format!("/course/{course}"), None).await;
        assert_eq!(anonymous.body["visits_count"].as_i64().unwrap(), prior + 3);
        assert_eq!(anonymous.body["recent_visits"][0]["user_id"], Value::Null);

        assert_eq!(t.get("/course/999", None).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn course_listing_filters() {
        let t = test_app(RegistrationMode::Approval).await;
        let admin_id = t.seed_active_admin("boss@edu.local");
        t.state.db.insert_course("Intro to Rust", "", "Programming", admin_id).unwrap();
        t.state.db.insert_course("Algebra", "", "Math", admin_id).unwrap();

        let all = t.get("/courses", None).await;
        assert_eq!(all.body.as_array().unwrap().len(), 2);
        assert_eq!(all.body[0]["title"], "Algebra");

        let filtered = t.get("/courses?q=rust&category=PROG", None).await;
        assert_eq!(filtered.body.as_array().unwrap().len(), 1);

        let none = t.get("/courses?q=rust&category=math", None).await;
        assert!(none.body.as_array().unwrap().is_empty());

        let blank = t.get("/courses?q=&category=", None).await;
        assert_eq!(blank.body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn foreign_notifications_cannot_be_marked_read() {
        let t = test_app(RegistrationMode::Approval).await;
        let dev_id = t.seed_developer();
        t.register("Mona", "mona@edu.local", Role::Admin).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let note = t.state.db.list_notifications(dev_id).unwrap()[0].id;
        let student = t.token("sara@edu.local").await;

        let reply = t.get(&format!("/notifications/read/{note}"), Some(&student)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(location(&reply), "/notifications");
        assert_eq!(reply.body["message"], "Not allowed.");
        assert!(!t.state.db.get_notification(note).unwrap().unwrap().is_read);

        let dev = t.token("dev@edu.local").await;
        let reply = t.get(&format!("/notifications/read/{note}"), Some(&dev)).await;
        assert_eq!(reply.body["level"], "success");
        assert!(t.state.db.get_notification(note).unwrap().unwrap().is_read);
        assert_eq!(reply.headers[&UNREAD_HEADER], "0");

        assert_eq!(t.get("/notifications/read/999", Some(&dev)).await.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn immediate_mode_logs_in_and_creates_profile() {
        let t = test_app(RegistrationMode::Immediate).await;

        let reply = t.register("Sara", "sara@edu.local", Role::Student).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert!(reply.headers[header::SET_COOKIE].to_str().unwrap().starts_with("academia_session="));
        let token = reply.body["token"].as_str().unwrap().to_string();

        let profile = t.get("/profile", Some(&token)).await;
        assert_eq!(profile.status, StatusCode::OK);
        assert!(profile.body["profile"].is_object());

        let admin = t.register("Mona", "mona@edu.local", Role::Admin).await;
        assert_eq!(admin.body["user"]["is_admin"], true);
        assert_eq!(admin.body["user"]["is_active"], true);
        assert_eq!(t.notification_count(), 0);
    }

    #[tokio::test]
    async fn profile_edits_upsert_in_place() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let token = t.token("sara@edu.local").await;

        let first = t
            .post_json("/profile", Some(&token), json!({ "city": "Cairo", "birth_date": "2008-05-01" }))
            .await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["profile"]["city"], "Cairo");

        let second = t
            .post_json("/profile", Some(&token), json!({ "name": "Sara A.", "school": "Nile School" }))
            .await;
        assert_eq!(second.body["user"]["name"], "Sara A.");
        assert_eq!(second.body["profile"]["city"], "Cairo");
        assert_eq!(second.body["profile"]["school"], "Nile School");
        assert_eq!(second.body["profile"]["birth_date"], "2008-05-01");

        let bad = t.post_json("/profile", Some(&token), json!({ "birth_date": "01/05/2008" })).await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let image = t.upload("/profile/upload", &token, "image", "me.png", b"\x89PNG").await;
        assert_eq!(image.status, StatusCode::OK);
        let stored = image.body["filename"].as_str().unwrap().to_string();
        let profile = t.get("/profile", Some(&token)).await;
        assert_eq!(profile.body["user"]["profile_image"], stored.as_str());
        assert!(stored.ends_with("_me.png"));
    }

    #[tokio::test]
    async fn settings_are_a_singleton_edited_by_admins() {
        let t = test_app(RegistrationMode::Approval).await;
        t.seed_active_admin("boss@edu.local");
        let admin = t.token("boss@edu.local").await;

        let reply = t
            .post_json(
                "/admin/settings",
                Some(&admin),
                json!({ "platform_name": "Madrasa", "support_email": "Help@Madrasa.io" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["support_email"], "help@madrasa.io");

        let logo = t.upload("/admin/settings/logo", &admin, "logo", "logo.gif", b"GIF89a").await;
        assert_eq!(logo.status, StatusCode::OK);

        let index = t.get("/", None).await;
        assert_eq!(index.body["settings"]["platform_name"], "Madrasa");
        assert_eq!(index.body["settings"]["logo_filename"], "logo.gif");
        assert_eq!(index.body["current_user"], Value::Null);
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let token = t.token("sara@edu.local").await;
        assert_eq!(t.get("/profile", Some(&token)).await.status, StatusCode::OK);

        let reply = t.get("/logout", Some(&token)).await;
        assert_eq!(reply.status, StatusCode::SEE_OTHER);

        let after = t.get("/profile", Some(&token)).await;
        assert_eq!(after.status, StatusCode::SEE_OTHER);
        assert_eq!(location(&after), "/login");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;

        assert_eq!(t.login("sara@edu.local", "wrong-pass").await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(t.login("nobody@edu.local", PASSWORD).await.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn courses_keep_their_own_files() {
        let t = test_app(RegistrationMode::Approval).await;
        let admin_id = t.seed_active_admin("boss@edu.local");
        let admin = t.token("boss@edu.local").await;
        let first = t.state.db.insert_course("Week one", "", "", admin_id).unwrap();
        let second = t.state.db.insert_course("Week two", "", "", admin_id).unwrap();

        t.upload(&format!("/upload-course/{first}"), &admin, "file", "intro.pdf", b"COURSE-1").await;
        t.upload(&format!("/upload-course/{second}"), &admin, "file", "intro.pdf", b"COURSE-2").await;

        for (course, content) in [(first, b"COURSE-1"), (second, b"COURSE-2")] {
            let stored = t.state.db.get_course(course).unwrap().unwrap().file_url.unwrap();
            assert_eq!(stored, "intro.pdf");
            let served = t.get(&format!("/uploads/{course}/{stored}"), None).await;
            assert_eq!(served.raw, content);
        }
    }

    #[tokio::test]
    async fn profile_images_are_per_user() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        t.register("Omar", "omar@edu.local", Role::Student).await;
        let sara = t.token("sara@edu.local").await;
        let omar = t.token("omar@edu.local").await;

        t.upload("/profile/upload", &sara, "image", "me.png", b"SARA").await;
        t.upload("/profile/upload", &omar, "image", "me.png", b"OMAR").await;

        for (token, content) in [(&sara, b"SARA"), (&omar, b"OMAR")] {
            let profile = t.get("/profile", Some(token.as_str())).await;
            let image = profile.body["user"]["profile_image"].as_str().unwrap().to_string();
            let served = t.get(&format!("/profile-images/{image}"), None).await;
            assert_eq!(served.status, StatusCode::OK);
            assert_eq!(served.raw, content);
        }
    }

    #[tokio::test]
    async fn stale_cookie_falls_back_to_bearer() {
        let t = test_app(RegistrationMode::Approval).await;
        t.register("Sara", "sara@edu.local", Role::Student).await;
        let token = t.token("sara@edu.local").await;

        let req = Request::builder()
            .method(Method::GET)
            .uri("/profile")
            .header(header::COOKIE, "academia_session=expired-or-forged")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let reply = t.send(req).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["user"]["email"], "sara@edu.local");
    }
}
