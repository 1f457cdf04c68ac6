// Adapters layer: concrete clients for the external services (model endpoints, geocoding, browser).

pub mod browser;
pub mod geocode;
pub mod map_page;
pub mod openai;
