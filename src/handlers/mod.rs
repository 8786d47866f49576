// HTTP request handlers for the relay
pub mod auth;
pub mod health;
pub mod proxy_upstream;

#[cfg(test)]
mod tests;

use actix_web::web;

// Re-export the main handler functions
pub use auth::ebsco_auth;
pub use health::health;
pub use proxy_upstream::{ebsco_proxy, motor_proxy};

/// Register every relay route
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Manual (legacy) login
        .route("/api/auth/ebsco", web::post().to(ebsco_auth))
        // Forwarding, any method
        .route("/api/ebsco-proxy/{tail:.*}", web::route().to(ebsco_proxy))
        .route("/api/motor-proxy/{tail:.*}", web::route().to(motor_proxy))
        // Health endpoint
        .route("/health", web::get().to(health));
}
