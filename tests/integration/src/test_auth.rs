//! End-to-end signing and verification over HTTP.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use recall_auth::{
        Clock, SignOptions, Signer, StaticCredentialProvider, SystemClock, Verifier,
        VerifierConfig,
    };
    use recall_auth_http::AuthHttpConfig;

    use crate::{TEST_API_KEY, TestServer, send_signed, test_credential, with_envelope};

    const UNAUTHORIZED: &str =
        r#"{"error":{"code":"unauthorized","message":"Authentication failed."}}"#;

    fn verifying_config() -> AuthHttpConfig {
        AuthHttpConfig {
            public_paths: vec!["/healthz".to_owned()],
            verifier: Some(Arc::new(Verifier::new(
                Arc::new(StaticCredentialProvider::from(test_credential())),
                VerifierConfig::default(),
            ))),
            ..AuthHttpConfig::default()
        }
    }

    fn hello() -> serde_json::Value {
        serde_json::json!({"hello": "world"})
    }

    #[tokio::test]
    async fn test_should_serve_health_without_signature() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();

        let resp = reqwest::get(config.url_for("/healthz")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_should_accept_signed_request() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signer = Signer::new(config.credential().clone());

        let resp = send_signed(&client, &config, &signer, "POST", "/ai/test", Some(&hello())).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["apiKey"], TEST_API_KEY);
        assert_eq!(body["method"], "POST");
        assert_eq!(body["path"], "/ai/test");
        assert_eq!(body["bodyBytes"], 17);
    }

    #[tokio::test]
    async fn test_should_accept_signed_request_without_body() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signer = Signer::new(config.credential().clone());

        let resp = send_signed(&client, &config, &signer, "GET", "/ai/models", None).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_request() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();

        let resp = reqwest::Client::new()
            .post(config.url_for("/ai/test"))
            .body(r#"{"hello":"world"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(resp.text().await.unwrap(), UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_replayed_request() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signed = Signer::new(config.credential().clone())
            .sign("POST", "/ai/test", Some(&hello()))
            .unwrap();

        let send = || {
            with_envelope(client.post(config.url_for("/ai/test")), &signed.envelope)
                .body(signed.body.clone())
                .send()
        };

        assert_eq!(send().await.unwrap().status(), reqwest::StatusCode::OK);
        let replay = send().await.unwrap();
        assert_eq!(replay.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(replay.text().await.unwrap(), UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_tampered_body() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signed = Signer::new(config.credential().clone())
            .sign("POST", "/ai/test", Some(&hello()))
            .unwrap();

        let resp = with_envelope(client.post(config.url_for("/ai/test")), &signed.envelope)
            .body(r#"{"hello":"mallory"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_request_moved_to_other_path() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signed = Signer::new(config.credential().clone())
            .sign("POST", "/ai/test", Some(&hello()))
            .unwrap();

        let resp = with_envelope(client.post(config.url_for("/ai/admin")), &signed.envelope)
            .body(signed.body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_wrong_secret() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signer = Signer::new(recall_core::Credential::new(TEST_API_KEY, "WRONG_SECRET"));

        let resp = send_signed(&client, &config, &signer, "POST", "/ai/test", Some(&hello())).await;
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(resp.text().await.unwrap(), UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_reject_stale_timestamp() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let stale = SystemClock.now() - 3_600;
        let signed = Signer::new(config.credential().clone())
            .sign_with(
                "POST",
                "/ai/test",
                Some(&hello()),
                &SignOptions {
                    timestamp: Some(stale),
                    nonce: None,
                },
            )
            .unwrap();

        let resp = with_envelope(client.post(config.url_for("/ai/test")), &signed.envelope)
            .body(signed.body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_should_accept_exactly_one_of_concurrent_replays() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signed = Signer::new(config.credential().clone())
            .sign("POST", "/ai/test", Some(&hello()))
            .unwrap();

        let requests = (0..8).map(|_| {
            with_envelope(client.post(config.url_for("/ai/test")), &signed.envelope)
                .body(signed.body.clone())
                .send()
        });
        let statuses: Vec<_> = futures::future::join_all(requests)
            .await
            .into_iter()
            .map(|resp| resp.unwrap().status())
            .collect();

        let accepted = statuses
            .iter()
            .filter(|s| **s == reqwest::StatusCode::OK)
            .count();
        assert_eq!(accepted, 1, "statuses: {statuses:?}");
        assert!(
            statuses
                .iter()
                .all(|s| *s == reqwest::StatusCode::OK || *s == reqwest::StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn test_should_pass_through_when_validation_skipped() {
        let server = TestServer::start(AuthHttpConfig {
            skip_signature_validation: true,
            ..AuthHttpConfig::default()
        })
        .await;
        let config = server.client_config();

        let resp = reqwest::Client::new()
            .post(config.url_for("/ai/test"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["apiKey"].is_null());
    }
}
