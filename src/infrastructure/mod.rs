// Infrastructure layer - External dependencies and adapters
pub mod api_client;
pub mod config;
pub mod delimited_source;
pub mod geolocation;
