// tests/pipeline_http.rs
//
// End-to-end runs through the real reqwest fetcher against wiremock servers.

use std::sync::Arc;
use std::time::Duration;

use bearblog_sentiment::fetch::{Fetcher, HttpFetcher};
use bearblog_sentiment::job::{JobManager, JobRunner, JobStatus, PROGRESS_DONE};
use bearblog_sentiment::report::{py_float, ReportStore};
use bearblog_sentiment::sentiment::{SentimentScorer, SentimentScores, VaderAnalyzer};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 0.5 for real post text, 0.0 for anything that looks like a placeholder.
struct HalfScorer;

impl SentimentScorer for HalfScorer {
    fn polarity_scores(&self, text: &str) -> SentimentScores {
        let compound = if text.starts_with("Error:") { 0.0 } else { 0.5 };
        SentimentScores {
            neg: 0.0,
            neu: 1.0 - compound,
            pos: compound,
            compound,
        }
    }
}

fn listing_html() -> String {
    r#"<html><body><main><ul class="blog-posts">
        <li><span>03 Feb, 2024</span><a href="/kind-words/">Kind words</a></li>
        <li><span>04 Feb, 2024</span><a href="/vanished/">Vanished</a></li>
    </ul></main></body></html>"#
        .to_string()
}

async fn mount_blog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing_html(), "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kind-words/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><body><main><h1>Kind words</h1><p>good</p></main></body></html>",
            "text/html",
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vanished/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn http_fetcher() -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(Duration::from_secs(5), "bearblog-sentiment-tests").unwrap())
}

async fn run_to_completion(mgr: &JobManager, domain: &str) -> JobStatus {
    let job = mgr.start(domain).expect("start");
    for _ in 0..500 {
        if !job.is_running() {
            return job.status();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job still running");
}

#[tokio::test]
async fn two_posts_one_404_averages_over_both() {
    let server = MockServer::start().await;
    mount_blog(&server).await;

    let fetcher = http_fetcher();
    let runner = JobRunner::new(fetcher, Arc::new(HalfScorer), "blog/");
    let tmp = tempfile::tempdir().unwrap();
    let mgr = JobManager::new(
        runner,
        ReportStore::new(tmp.path().join("report.txt")),
        Duration::from_secs(30),
    );

    assert_eq!(run_to_completion(&mgr, &server.uri()).await, JobStatus::Done);
    assert_eq!(mgr.current().unwrap().progress(), PROGRESS_DONE);

    let text = mgr.report().expect("report stored");
    assert!(text.starts_with("Average Compound Score: 0.25\n\n"), "{text}");
    assert_eq!(text.matches(&"=".repeat(80)).count(), 2);
    assert!(text.contains("Content:\nKind words\ngood\n"));
    assert!(text.contains("Content:\nError: Unable to fetch content (status code: 404)\n"));
    assert!(text.contains(&format!("Link: {}/vanished/", server.uri())));

    let on_disk = std::fs::read_to_string(tmp.path().join("report.txt")).unwrap();
    assert_eq!(on_disk, &*text);
}

#[tokio::test]
async fn vader_scores_for_the_same_blog_are_pinned() {
    let server = MockServer::start().await;
    mount_blog(&server).await;

    let runner = JobRunner::new(http_fetcher(), Arc::new(VaderAnalyzer::new()), "blog/");
    let tmp = tempfile::tempdir().unwrap();
    let mgr = JobManager::new(
        runner,
        ReportStore::new(tmp.path().join("report.txt")),
        Duration::from_secs(30),
    );
    assert_eq!(run_to_completion(&mgr, &server.uri()).await, JobStatus::Done);

    let text = mgr.report().unwrap();
    // "Kind words\ngood": kind (2.4) and good (1.9) in lexicon.
    let kind = VaderAnalyzer::new().polarity_scores("Kind words\ngood");
    let placeholder =
        VaderAnalyzer::new().polarity_scores("Error: Unable to fetch content (status code: 404)");
    assert_eq!(placeholder.compound, -0.4019);
    assert!(text.contains(&format!("Sentiment Scores: {kind}")));
    assert!(text.contains(&format!("Sentiment Scores: {placeholder}")));

    let expected_avg = (kind.compound + placeholder.compound) / 2.0;
    assert!(text.starts_with(&format!("Average Compound Score: {}\n", py_float(expected_avg))));
}

#[tokio::test]
async fn listing_404_fails_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let runner = JobRunner::new(http_fetcher(), Arc::new(HalfScorer), "blog/");
    let tmp = tempfile::tempdir().unwrap();
    let mgr = JobManager::new(
        runner,
        ReportStore::new(tmp.path().join("report.txt")),
        Duration::from_secs(30),
    );
    assert_eq!(run_to_completion(&mgr, &server.uri()).await, JobStatus::Failed);
    assert_eq!(mgr.current().unwrap().progress(), -1);
    assert!(mgr.report().is_none());
    assert!(!tmp.path().join("report.txt").exists());
}

#[tokio::test]
async fn http_fetcher_returns_non_2xx_without_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
    let page = http_fetcher().get(&url).await.expect("status is not an error");
    assert_eq!(page.status, 404);
    assert_eq!(page.body, "nope");
    assert!(!page.is_success());
}

#[tokio::test]
async fn http_fetcher_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_millis(100), "t").unwrap();
    assert_eq!(fetcher.timeout(), Duration::from_millis(100));
    let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
    assert!(fetcher.get(&url).await.is_err());
}
