use axum::{
    routing::{get, put, MethodRouter},
    Router,
};

use crate::{handlers, state::AppState};

/// Method and path of every registered endpoint, in registration order.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/patients/:patient_id/permissions/owner"),
    ("PUT", "/patients/:patient_id/permissions/owner"),
    ("GET", "/patients/:patient_id/consents"),
    ("PUT", "/patients/:patient_id/consents/grant/:id"),
    ("PUT", "/patients/:patient_id/consents/revoke/:id"),
];

fn route_table() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        (
            "/patients/:patient_id/permissions/owner",
            get(handlers::get_owner).put(handlers::set_owner),
        ),
        ("/patients/:patient_id/consents", get(handlers::list_consents)),
        (
            "/patients/:patient_id/consents/grant/:id",
            put(handlers::grant_consent),
        ),
        (
            "/patients/:patient_id/consents/revoke/:id",
            put(handlers::revoke_consent),
        ),
    ]
}

/// Builds the application router from the route table.
pub fn router(state: AppState) -> Router {
    route_table()
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| router.route(path, handler))
        .fallback(handlers::not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    };
    use phenotips_patient_access::{
        AccessOptions, ConsentRegistry, InMemoryPatientRepository, PatientAccessRuntime, PatientRepository,
        PatientRecord, UserDirectory, UserProfile, UserRef, Visibility,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::CALLER_HEADER;

    fn user(name: &str) -> UserRef {
        UserRef::parse(name).unwrap()
    }

    fn app() -> Router {
        let mut directory = UserDirectory::new();
        directory.insert(UserProfile::new(user("alice"), "Alice Liddell").with_email("alice@example.org"));
        directory.insert(UserProfile::new(user("bob"), "Bob Builder"));
        directory.insert(UserProfile::new(user("eve"), "Eve"));
        let repository = InMemoryPatientRepository::new();
        repository.insert(PatientRecord::new("P0000001", user("alice")));
        repository.insert(
            PatientRecord::new("P0000002", user("bob")).with_visibility(Visibility::Public),
        );
        let runtime = PatientAccessRuntime::new(
            Arc::new(repository),
            directory,
            ConsentRegistry::default(),
            AccessOptions::default(),
        );
        router(AppState::new(runtime))
    }

    fn request(method: Method, uri: &str, caller: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match caller {
            Some(caller) => builder.header(CALLER_HEADER, caller),
            None => builder,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[test]
    fn table_matches_registered_routes() {
        let registered: usize = route_table()
            .iter()
            .map(|(path, _)| ROUTES.iter().filter(|(_, p)| p == path).count())
            .sum();
        assert_eq!(registered, ROUTES.len());
    }

    #[tokio::test]
    async fn owner_round_trip_over_json_and_form() {
        let app = app();
        let (status, body) = send(
            &app,
            request(Method::GET, "/patients/P0000001/permissions/owner", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "id": "xwiki:XWiki.alice",
                "name": "Alice Liddell",
                "email": "alice@example.org",
                "type": "user",
            })
        );

        let (status, body) = send(
            &app,
            request(Method::PUT, "/patients/P0000001/permissions/owner", Some("XWiki.alice"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"id":"xwiki:XWiki.bob"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "xwiki:XWiki.bob");

        let (status, _) = send(
            &app,
            request(Method::PUT, "/patients/P0000001/permissions/owner", Some("bob"))
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("owner=alice"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(
            &app,
            request(Method::GET, "/patients/P0000001/permissions/owner", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["id"], "xwiki:XWiki.alice");
    }

    #[tokio::test]
    async fn owner_errors_map_to_statuses() {
        let app = app();
        let cases = [
            ("P0000404", Some("alice"), "application/json", r#"{"id":"bob"}"#, StatusCode::NOT_FOUND),
            ("P0000001", Some("eve"), "application/json", r#"{"id":"bob"}"#, StatusCode::FORBIDDEN),
            ("P0000001", None, "application/json", r#"{"id":"bob"}"#, StatusCode::FORBIDDEN),
            ("P0000001", Some("alice"), "application/json", r#"{"id":"ghost"}"#, StatusCode::BAD_REQUEST),
            ("P0000001", Some("alice"), "application/json", r#"{"id":""}"#, StatusCode::BAD_REQUEST),
            ("P0000001", Some("alice"), "application/json", "not json", StatusCode::BAD_REQUEST),
            ("P0000001", Some("alice"), "application/x-www-form-urlencoded", "user=bob", StatusCode::BAD_REQUEST),
            ("P0000001", Some("alice"), "text/plain", "bob", StatusCode::UNSUPPORTED_MEDIA_TYPE),
        ];
        for (patient, caller, content_type, body, expected) in cases {
            let (status, payload) = send(
                &app,
                request(Method::PUT, &format!("/patients/{patient}/permissions/owner"), caller)
                    .header(CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
            assert_eq!(status, expected, "{patient} {caller:?} {content_type} {body}");
            assert!(payload["error"].is_string());
        }

        let (status, _) = send(
            &app,
            request(Method::GET, "/patients/P0000404/permissions/owner", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn consents_grant_and_revoke_idempotently() {
        let app = app();
        for _ in 0..2 {
            let (status, body) = send(
                &app,
                request(Method::PUT, "/patients/P0000001/consents/grant/genetic", Some("alice"))
                    .header(CONTENT_TYPE, "text/plain")
                    .body(Body::from("ignored"))
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "yes");
        }
        let (status, body) = send(
            &app,
            request(Method::PUT, "/patients/P0000001/consents/revoke/matching", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "no");

        let (status, body) = send(
            &app,
            request(Method::GET, "/patients/P0000001/consents", Some("alice"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let statuses: Vec<(&str, &str)> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|view| (view["id"].as_str().unwrap(), view["status"].as_str().unwrap()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("real_consent", "not_set"),
                ("genetic", "yes"),
                ("share_history", "not_set"),
                ("share_images", "not_set"),
                ("matching", "no"),
            ]
        );
    }

    #[tokio::test]
    async fn consent_errors_map_to_statuses() {
        let app = app();
        let cases = [
            (Method::PUT, "/patients/P0000404/consents/grant/genetic", Some("alice"), StatusCode::NOT_FOUND),
            (Method::PUT, "/patients/P0000001/consents/grant/genetic", Some("eve"), StatusCode::FORBIDDEN),
            (Method::PUT, "/patients/P0000001/consents/grant/bogus", Some("alice"), StatusCode::BAD_REQUEST),
            (Method::PUT, "/patients/P0000002/consents/revoke/genetic", None, StatusCode::FORBIDDEN),
            (Method::GET, "/patients/P0000002/consents", None, StatusCode::OK),
            (Method::GET, "/patients/P0000001/consents", Some("mallory"), StatusCode::FORBIDDEN),
            (Method::GET, "/nowhere", None, StatusCode::NOT_FOUND),
        ];
        for (method, uri, caller, expected) in cases {
            let (status, _) = send(&app, request(method, uri, caller).body(Body::empty()).unwrap()).await;
            assert_eq!(status, expected, "{uri} {caller:?}");
        }
    }
}
