//! Web search adapters.

pub mod google;

pub use google::{html_to_text, truncate_chars, GoogleSearchProvider};
