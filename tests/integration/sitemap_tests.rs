//! Integration tests for sitemap discovery and feed formats

use std::collections::HashMap;
use std::time::Duration;
use sumi_sweep::config::UserAgentConfig;
use sumi_sweep::crawler::{build_http_client, Fetcher};
use sumi_sweep::robots::RobotsCache;
use sumi_sweep::sitemap::SitemapResolver;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> Fetcher {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    let client = build_http_client(&user_agent, Duration::from_secs(5), true).unwrap();
    Fetcher::new(client, None, HashMap::new())
}

async fn serve(server: &MockServer, at: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn paths(requests: &[sumi_sweep::Request]) -> Vec<String> {
    requests.iter().map(|r| r.url.path().to_string()).collect()
}

#[tokio::test]
async fn test_rss_feed() {
    let server = MockServer::start().await;
    let base = server.uri();
    serve(
        &server,
        "/feed.xml",
        200,
        &format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>News</title>
  <item><title>First</title><link>{base}/news/1</link><pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate></item>
  <item><title>Second</title><link>{base}/news/2</link></item>
</channel></rss>"#,
            base = base
        ),
    )
    .await;

    let resolver = SitemapResolver::new(fetcher());
    let requests = resolver.resolve(&format!("{}/feed.xml", base), 10, None).await;
    assert_eq!(paths(&requests), vec!["/news/1", "/news/2"]);
}

#[tokio::test]
async fn test_atom_feed() {
    let server = MockServer::start().await;
    let base = server.uri();
    serve(
        &server,
        "/atom.xml",
        200,
        &format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Blog</title>
  <entry><title>A</title><link rel="alternate" href="{base}/posts/a"/><updated>2024-02-01T00:00:00Z</updated></entry>
  <entry><title>B</title><link href="{base}/posts/b"/><published>2024-03-01T00:00:00Z</published></entry>
</feed>"#,
            base = base
        ),
    )
    .await;

    let resolver = SitemapResolver::new(fetcher());
    let requests = resolver.resolve(&format!("{}/atom.xml", base), 10, None).await;
    assert_eq!(paths(&requests), vec!["/posts/a", "/posts/b"]);
}

#[tokio::test]
async fn test_plain_text_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();
    serve(
        &server,
        "/sitemap.txt",
        200,
        &format!("{base}/a\n{base}/b\n\n{base}/a\n{base}/files/c.pdf\n", base = base),
    )
    .await;

    let resolver = SitemapResolver::new(fetcher());
    let requests = resolver.resolve(&format!("{}/sitemap.txt", base), 10, None).await;
    assert_eq!(paths(&requests), vec!["/a", "/b", "/files/c.pdf"]);
    assert!(requests[2].skip_navigation);
    assert!(!requests[0].skip_navigation);
}

#[tokio::test]
async fn test_self_referencing_index_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();
    serve(
        &server,
        "/index.xml",
        200,
        &format!(
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/index.xml</loc></sitemap>
  <sitemap><loc>{base}/pages.xml</loc></sitemap>
</sitemapindex>"#,
            base = base
        ),
    )
    .await;
    serve(
        &server,
        "/pages.xml",
        200,
        &format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>{base}/only</loc></url></urlset>"#,
            base = base
        ),
    )
    .await;

    let resolver = SitemapResolver::new(fetcher());
    let requests = resolver.resolve(&format!("{}/index.xml", base), 10, None).await;
    assert_eq!(paths(&requests), vec!["/only"]);
    assert_eq!(resolver.visited_count(), 2);
}

#[tokio::test]
async fn test_discovery_prefers_robots_then_well_known() {
    let listed = MockServer::start().await;
    serve(
        &listed,
        "/robots.txt",
        200,
        &format!("User-agent: *\nDisallow:\nSitemap: {}/custom-map.xml\n", listed.uri()),
    )
    .await;

    let probed = MockServer::start().await;
    serve(&probed, "/robots.txt", 404, "").await;
    serve(&probed, "/sitemap_index.xml", 200, "<sitemapindex/>").await;

    let fetcher = fetcher();
    let resolver = SitemapResolver::new(fetcher.clone());
    let robots = RobotsCache::new(fetcher);

    let seed = Url::parse(&format!("{}/", listed.uri())).unwrap();
    assert_eq!(
        resolver.discover(&seed, &robots).await,
        vec![format!("{}/custom-map.xml", listed.uri())]
    );

    let seed = Url::parse(&format!("{}/", probed.uri())).unwrap();
    assert_eq!(
        resolver.discover(&seed, &robots).await,
        vec![format!("{}/sitemap_index.xml", probed.uri())]
    );
}
