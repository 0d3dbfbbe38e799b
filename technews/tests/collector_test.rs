use mockito::Matcher;
use technews::collector::{ArticleSource, NewsCollector};
use technews::error::AgentError;

const EVERYTHING_PATH: &str = "/v2/everything";

fn categories() -> Vec<String> {
    vec![
        "technology".to_string(),
        "science".to_string(),
        "business".to_string(),
    ]
}

fn query_for(category: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("q".into(), category.into()),
        Matcher::UrlEncoded("sortBy".into(), "popularity".into()),
        Matcher::UrlEncoded("language".into(), "en".into()),
        Matcher::UrlEncoded("pageSize".into(), "6".into()),
        Matcher::Regex(r"from=\d{4}-\d{2}-\d{2}".into()),
        Matcher::Regex(r"to=\d{4}-\d{2}-\d{2}".into()),
    ])
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_categories() {
    let mut server = mockito::Server::new_async().await;

    let tech = server
        .mock("GET", EVERYTHING_PATH)
        .match_query(query_for("technology"))
        .match_header("x-api-key", "fake-news-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "status": "ok",
                "totalResults": 2,
                "articles": [
                    {
                        "source": {"id": null, "name": "The Verge"},
                        "title": "New chip doubles battery life",
                        "description": "A new mobile chip.",
                        "url": "https://example.com/chip",
                        "publishedAt": "2026-10-15T08:00:00Z"
                    },
                    {
                        "source": {"id": "wired", "name": "Wired"},
                        "title": "Open model tops benchmark",
                        "description": null,
                        "url": "https://example.com/model",
                        "publishedAt": "2026-10-14T12:30:00Z"
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let science = server
        .mock("GET", EVERYTHING_PATH)
        .match_query(query_for("science"))
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let business = server
        .mock("GET", EVERYTHING_PATH)
        .match_query(query_for("business"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "error", "code": "rateLimited", "message": "Too many requests"}"#)
        .create_async()
        .await;

    let collector = NewsCollector::new(
        format!("{}{}", server.url(), EVERYTHING_PATH),
        "fake-news-key",
        20,
    )
    .expect("collector");

    let articles = collector.fetch(&categories()).await.expect("partial success");

    assert_eq!(articles.len(), 2);
    assert!(articles.iter().all(|a| a.category == "technology"));
    assert_eq!(articles[0].title, "New chip doubles battery life");
    assert_eq!(articles[0].source, "The Verge");
    assert_eq!(
        articles[0].published_at.map(|t| t.to_rfc3339()).as_deref(),
        Some("2026-10-15T08:00:00+00:00")
    );
    assert!(articles[1].description.is_none());

    tech.assert_async().await;
    science.assert_async().await;
    business.assert_async().await;
}

#[tokio::test]
async fn test_all_categories_failing_is_a_collection_error() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", EVERYTHING_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid"}"#)
        .expect(3)
        .create_async()
        .await;

    let collector = NewsCollector::new(
        format!("{}{}", server.url(), EVERYTHING_PATH),
        "bad-key",
        20,
    )
    .expect("collector");

    let err = collector.fetch(&categories()).await.unwrap_err();

    match err {
        AgentError::Collection(reason) => {
            assert!(reason.contains("technology"));
            assert!(reason.contains("science"));
            assert!(reason.contains("business"));
            assert!(reason.contains("401"));
        }
        other => panic!("expected collection error, got {:?}", other),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_results_are_a_collection_error() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", EVERYTHING_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "ok", "totalResults": 0, "articles": []}"#)
        .create_async()
        .await;

    let collector = NewsCollector::new(
        format!("{}{}", server.url(), EVERYTHING_PATH),
        "fake-news-key",
        20,
    )
    .expect("collector");

    let err = collector
        .fetch(&["technology".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Collection(_)));

    mock.assert_async().await;
}
