// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use harvestrs::engines::{FetchEngine, FetchRequest, HttpEngine};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Mock servers bind to loopback, which SSRF protection rejects by default
fn allow_loopback() {
    std::env::set_var("HARVEST_DISABLE_SSRF_PROTECTION", "true");
}

#[tokio::test]
async fn fetches_static_html() {
    allow_loopback();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/crash"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><article>Collision on I-26</article></body></html>"),
        )
        .mount(&server)
        .await;

    let engine = HttpEngine;
    let request = FetchRequest::new(format!("{}/news/crash", server.uri()));
    let page = engine.fetch(&request).await.unwrap();

    assert_eq!(page.status, 200);
    assert!(page.html.contains("Collision on I-26"));
    assert!(page.observed_responses.is_empty());
}

#[tokio::test]
async fn reports_status_of_error_pages() {
    allow_loopback();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let engine = HttpEngine;
    let request = FetchRequest::new(format!("{}/gone", server.uri()));
    let page = engine.fetch(&request).await.unwrap();

    assert_eq!(page.status, 404);
}

#[tokio::test]
async fn honors_fixed_wait_before_returning() {
    allow_loopback();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let engine = HttpEngine;
    let mut request = FetchRequest::new(server.uri());
    request.wait = harvestrs::engines::WaitStrategy::FixedMs(200);

    let started = std::time::Instant::now();
    engine.fetch(&request).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn declines_requests_it_cannot_serve() {
    let engine = HttpEngine;

    let static_req = FetchRequest::new("https://example.com");
    assert_eq!(engine.support_score(&static_req), 100);

    let rendered = FetchRequest::rendered("https://example.com");
    assert_eq!(engine.support_score(&rendered), 0);

    let mut sniffing = FetchRequest::new("https://example.com");
    sniffing.sniff = true;
    assert_eq!(engine.support_score(&sniffing), 0);
}
