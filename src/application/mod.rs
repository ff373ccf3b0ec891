// Application layer - Rendering pipeline, refresh loop and submission use cases
pub mod expansion;
pub mod map_renderer;
pub mod map_surface;
pub mod refresh_service;
pub mod stress_api;
pub mod submission_service;
