//! End-to-end tests against wiremock servers

mod crawl_tests;
mod sitemap_tests;
