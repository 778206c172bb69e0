//! Page source module
//!
//! The upstream paginated list endpoint, seen through one operation:
//! `query_page(window) -> Page`.
//!
//! # Overview
//!
//! - `PageSource` - trait implemented by anything that can serve a window of records
//! - `Page` - one response: records plus a `more` hint
//! - `HttpPageSource` - implementation over [`HttpClient`](crate::http::HttpClient)
//!   driven by [`EntityConfig`](crate::config::EntityConfig)

mod http;
mod types;

pub use http::HttpPageSource;
pub use types::{Page, PageSource, RequestDescription};
