//! Community API: wire types, HTTP client, query keys and cached queries.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod queries;
pub mod types;

pub use client::CommunityClient;
pub use queries::CommunityQueries;
