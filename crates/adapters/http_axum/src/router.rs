//! Axum router assembly.

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{
    CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use hpapower_app::ports::ActuatorDriver;

use crate::state::AppState;

const CSP: &str = "default-src 'self'; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

/// Build the top-level axum [`Router`].
///
/// There are no routes: every request lands on the fallback
/// [`dispatch`](crate::dispatch::dispatch) handler, which decides between the
/// control endpoint and the static mount. Includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level, and security headers
/// added to responses that do not carry them already.
pub fn build<D>(state: AppState<D>) -> Router
where
    D: ActuatorDriver + 'static,
{
    Router::new()
        .fallback(crate::dispatch::dispatch::<D>)
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CSP),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use hpapower_app::services::actuator_store::ActuatorStore;
    use hpapower_app::services::transaction::ControlEndpoint;
    use hpapower_domain::error::ActuatorError;
    use hpapower_domain::power::PowerState;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Driver that refuses to energize when `refuse_on` is set.
    struct StubDriver {
        refuse_on: bool,
    }

    impl ActuatorDriver for StubDriver {
        fn initialize(&mut self) -> Result<(), ActuatorError> {
            Ok(())
        }

        fn set_level(&mut self, energized: bool) -> Result<(), ActuatorError> {
            if energized && self.refuse_on {
                return Err(ActuatorError::Driver("line stuck".into()));
            }
            Ok(())
        }
    }

    struct Harness {
        _htdocs: TempDir,
        store: ActuatorStore<StubDriver>,
        app: Router,
    }

    fn harness(refuse_on: bool) -> Harness {
        let htdocs = TempDir::new().unwrap();
        std::fs::write(htdocs.path().join("index.html"), "<h1>hpapower</h1>").unwrap();
        let store = ActuatorStore::start(StubDriver { refuse_on }).unwrap();
        let state = AppState::new(store.clone(), ControlEndpoint::default(), htdocs.path());
        Harness {
            _htdocs: htdocs,
            store,
            app: build(state),
        }
    }

    fn post(content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/hpa_power_set")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn should_report_state_for_empty_post() {
        let h = harness(false);

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(body_text(response).await, r#"{"state": false}"#);
    }

    #[tokio::test]
    async fn should_switch_on_from_urlencoded_form() {
        let h = harness(false);

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", "state=on"))
            .await
            .unwrap();

        assert_eq!(body_text(response).await, r#"{"state": true}"#);
        assert_eq!(h.store.get(), PowerState::On);
    }

    #[tokio::test]
    async fn should_switch_from_multipart_form() {
        let h = harness(false);
        h.store.set(PowerState::On).unwrap();
        let body = "--XyZ\r\nContent-Disposition: form-data; name=\"state\"\r\n\r\noff\r\n--XyZ--\r\n";

        let response = h
            .app
            .oneshot(post("multipart/form-data; boundary=XyZ", body))
            .await
            .unwrap();

        assert_eq!(body_text(response).await, r#"{"state": false}"#);
        assert_eq!(h.store.get(), PowerState::Off);
    }

    #[tokio::test]
    async fn should_leave_state_unchanged_for_unknown_value() {
        let h = harness(false);

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", "state=banana"))
            .await
            .unwrap();

        assert_eq!(body_text(response).await, r#"{"state": false}"#);
    }

    #[tokio::test]
    async fn should_break_body_stream_when_field_exceeds_budget() {
        let h = harness(false);
        let body = format!("state={}", "a".repeat(2048));

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.into_body().collect().await.is_err());
        assert_eq!(h.store.get(), PowerState::Off);
    }

    #[tokio::test]
    async fn should_break_body_stream_for_unsupported_content_type() {
        let h = harness(false);

        let response = h
            .app
            .oneshot(post("application/json", r#"{"state":"on"}"#))
            .await
            .unwrap();

        assert!(response.into_body().collect().await.is_err());
        assert_eq!(h.store.get(), PowerState::Off);
    }

    #[tokio::test]
    async fn should_break_body_stream_when_driver_fails() {
        let h = harness(true);

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", "state=on"))
            .await
            .unwrap();

        assert!(response.into_body().collect().await.is_err());
        assert_eq!(h.store.get(), PowerState::Off);
    }

    #[tokio::test]
    async fn should_tear_down_and_keep_state_when_client_leaves_mid_body() {
        let h = harness(false);
        let body = Body::from_stream(tokio_stream::iter(vec![
            Ok("state=o"),
            Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset)),
        ]));

        let response = h
            .app
            .oneshot(post("application/x-www-form-urlencoded", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.into_body().collect().await.is_err());
        assert_eq!(h.store.get(), PowerState::Off);
    }

    #[tokio::test]
    async fn should_serve_index_for_root() {
        let h = harness(false);

        let response = h.app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>hpapower</h1>");
    }

    #[tokio::test]
    async fn should_return_not_found_for_missing_file() {
        let h = harness(false);

        let response = h.app.oneshot(get("/missing.txt")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn should_add_security_headers() {
        let h = harness(false);

        let response = h.app.oneshot(get("/")).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(REFERRER_POLICY).unwrap(), "no-referrer");
        assert_eq!(headers.get(CONTENT_SECURITY_POLICY).unwrap(), CSP);
    }
}
