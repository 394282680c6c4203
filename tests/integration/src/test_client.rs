//! The signing client against a live service.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use recall_auth::{NonceSource, Signer, StaticCredentialProvider, Verifier, VerifierConfig};
    use recall_auth_http::AuthHttpConfig;
    use recall_client::{ClientError, RecallClient};
    use recall_core::{ClientConfig, Credential};
    use reqwest::StatusCode;

    use crate::{TEST_API_KEY, TestServer, test_credential};

    /// Hands out the same nonce every time.
    struct RepeatingNonce;

    impl NonceSource for RepeatingNonce {
        fn next_nonce(&self) -> String {
            "rn-repeated".to_owned()
        }
    }

    fn verifying_config() -> AuthHttpConfig {
        AuthHttpConfig {
            verifier: Some(Arc::new(Verifier::new(
                Arc::new(StaticCredentialProvider::from(test_credential())),
                VerifierConfig::default(),
            ))),
            ..AuthHttpConfig::default()
        }
    }

    fn expect_api_error(err: ClientError) -> (StatusCode, Option<String>, String) {
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => (status, code, message),
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_should_post_signed_json_and_decode_reply() {
        let server = TestServer::start(verifying_config()).await;
        let client = RecallClient::new(server.client_config());

        let reply: serde_json::Value = client
            .post("/ai/themes/suggest", &serde_json::json!({"asset_id": "a-1"}))
            .await
            .unwrap();
        assert_eq!(reply["apiKey"], TEST_API_KEY);
        assert_eq!(reply["method"], "POST");
        assert_eq!(reply["path"], "/ai/themes/suggest");
        assert_eq!(reply["bodyBytes"], 18);
    }

    #[tokio::test]
    async fn test_should_sign_bodyless_get() {
        let server = TestServer::start(verifying_config()).await;
        let client = RecallClient::new(server.client_config());

        let reply: serde_json::Value = client
            .call_endpoint(reqwest::Method::GET, "/ai/status", None::<&serde_json::Value>)
            .await
            .unwrap();
        assert_eq!(reply["method"], "GET");
        assert_eq!(reply["bodyBytes"], 0);
    }

    #[tokio::test]
    async fn test_should_surface_generic_401_message() {
        let server = TestServer::start(verifying_config()).await;
        let base_url = server.client_config().base_url().to_owned();
        let client = RecallClient::new(ClientConfig::new(
            base_url,
            Credential::new(TEST_API_KEY, "wrong-secret"),
        ));

        let err = client
            .post::<_, serde_json::Value>("/ai/test", &serde_json::json!({"hello": "world"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authentication failed.");
        let (status, code, message) = expect_api_error(err);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code.as_deref(), Some("unauthorized"));
        assert_eq!(message, "Authentication failed.");
    }

    #[tokio::test]
    async fn test_should_reject_second_use_of_same_nonce() {
        let server = TestServer::start(verifying_config()).await;
        let config = server.client_config();
        let signer = Signer::new(config.credential().clone()).with_nonce_source(Arc::new(RepeatingNonce));
        let client = RecallClient::new(config).with_signer(signer);
        let body = serde_json::json!({"hello": "world"});

        let first: serde_json::Value = client.post("/ai/test", &body).await.unwrap();
        assert_eq!(first["apiKey"], TEST_API_KEY);

        let err = client
            .post::<_, serde_json::Value>("/ai/test", &body)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_should_surface_body_limit_as_bad_request() {
        let server = TestServer::start(AuthHttpConfig {
            max_body_bytes: 8,
            ..verifying_config()
        })
        .await;
        let client = RecallClient::new(server.client_config());

        let err = client
            .post::<_, serde_json::Value>("/ai/test", &serde_json::json!({"hello": "world"}))
            .await
            .unwrap_err();
        let (status, code, message) = expect_api_error(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code.as_deref(), Some("bad-request"));
        assert_eq!(message, "Request body exceeds 8 bytes");
    }

    #[tokio::test]
    async fn test_should_report_transport_failure_with_path() {
        // Nothing listens on port 1.
        let config = ClientConfig::new("http://127.0.0.1:1", test_credential());

        let err = RecallClient::new(config)
            .post::<_, serde_json::Value>("/ai/test", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport { ref path, .. } if path == "/ai/test"));
    }
}
