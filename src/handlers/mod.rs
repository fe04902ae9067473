// Public reads: GET /api/blogs, GET /api/blogs/:id, GET /health
// Authenticated writes: POST /api/blogs, PUT and DELETE /api/blogs/:id
pub mod blogs;
pub mod health;

pub use health::{health, unknown_endpoint};
