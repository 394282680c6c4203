//! Per-key rate limiting over HTTP.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use recall_auth::clock::ManualClock;
    use recall_auth::{RateLimiter, Signer, StaticCredentialProvider, Verifier, VerifierConfig};
    use recall_auth_http::AuthHttpConfig;

    use crate::{TestServer, send_signed, test_credential};

    /// Start of a rate-limit window, so every request below lands in it.
    const WINDOW_START: u64 = 1_735_787_040;

    #[tokio::test]
    async fn test_should_return_429_once_budget_is_spent() {
        let clock = Arc::new(ManualClock::new(WINDOW_START + 5));
        let server = TestServer::start(AuthHttpConfig {
            verifier: Some(Arc::new(
                Verifier::new(
                    Arc::new(StaticCredentialProvider::from(test_credential())),
                    VerifierConfig::default(),
                )
                .with_clock(clock.clone()),
            )),
            rate_limiter: Some(Arc::new(RateLimiter::new(2))),
            ..AuthHttpConfig::default()
        })
        .await;
        let config = server.client_config();
        let client = reqwest::Client::new();
        let signer = Signer::new(config.credential().clone()).with_clock(clock.clone());

        for _ in 0..2 {
            let resp = send_signed(&client, &config, &signer, "GET", "/ai/test", None).await;
            assert_eq!(resp.status(), reqwest::StatusCode::OK);
        }

        let resp = send_signed(&client, &config, &signer, "GET", "/ai/test", None).await;
        assert_eq!(resp.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["retry-after"], "55");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "rate-limit");

        // The next window starts a fresh budget.
        clock.set(WINDOW_START + 60);
        let resp = send_signed(&client, &config, &signer, "GET", "/ai/test", None).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }
}
