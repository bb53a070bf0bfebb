//! Credential injection for outgoing API requests.

mod url_param;

pub use url_param::UrlParam;
