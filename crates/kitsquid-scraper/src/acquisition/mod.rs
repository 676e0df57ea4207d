//! Document acquisition: HTTP fetching, URL construction and field
//! extraction shared by every scrape job.

pub mod document;
pub mod endpoints;
pub mod http_client;
