//! Two-stage demo against httpbin.org: the first stage posts a token, the
//! second builds its request from the mapped echo and sends the token back
//! as a bearer header.
//!
//! Run with `cargo run --example auth_then_fetch`.

use anyhow::Result;
use reqchain::adapter::HttpAdapter;
use reqchain::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut chain = RequestChain::begin(
        RequestStage::new(RequestDescriptor::post(
            "https://httpbin.org/post",
            json!({"token": "demo-token-123"}),
        ))
        .with_mapper(|raw| {
            raw["body"]["json"]["token"]
                .as_str()
                .map(|token| json!(token))
                .ok_or_else(|| "echo response carries no token".to_string())
        }),
        Arc::new(HttpAdapter::new()),
    )
    .next(
        RequestStage::from_factory(|token| {
            let token = token
                .and_then(|value| value.as_str())
                .ok_or_else(|| "previous stage produced no token".to_string())?;
            Ok(RequestDescriptor::get("https://httpbin.org/headers")
                .with_header("Authorization", format!("Bearer {token}")))
        })
        .with_retry_policy(
            RetryPolicy::new()
                .with_max_retries(2)
                .with_retry_delay_ms(250)
                .with_exponential_backoff(true),
        ),
    )
    .with_finish_handler(|| tracing::info!("Chain finished"));

    let headers_echo = chain.execute().await?;
    println!(
        "httpbin saw: {}",
        serde_json::to_string_pretty(&headers_echo["body"]["headers"])?
    );
    Ok(())
}
