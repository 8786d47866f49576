#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use motor_relay::{
    handlers::configure_routes, settings::RelaySettings, Forwarder, SessionManager, VERSION,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = RelaySettings::load().context("Failed to load settings")?;

    let sessions = web::Data::new(
        SessionManager::from_settings(&settings).context("Failed to configure EBSCO login")?,
    );
    let forwarder = web::Data::new(
        Forwarder::new(&settings.proxy).context("Failed to build upstream HTTP client")?,
    );

    print_startup_info(&settings);

    if settings.auth.auto_auth_ready() && !sessions.startup_authenticate().await {
        log::warn!("Initial EBSCO authentication failed, will retry on the first proxied request");
    }

    print_endpoints(&settings);

    start_server(settings, sessions, forwarder)
        .await
        .context("HTTP server failed")
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(
    settings: RelaySettings,
    sessions: web::Data<SessionManager>,
    forwarder: web::Data<Forwarder>,
) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    let any_origin = settings.allows_any_origin();
    let cors_origins = settings.get_cors_origins();
    let max_body_bytes = settings.proxy.max_body_bytes;

    HttpServer::new(move || {
        let cors = if any_origin {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            let cors_origins = cors_origins.clone();
            Cors::default()
                .allowed_origin_fn(move |origin, _| {
                    cors_origins
                        .iter()
                        .any(|allowed| allowed == origin.to_str().unwrap_or(""))
                })
                .allow_any_method()
                .allow_any_header()
                .max_age(3600)
        };

        App::new()
            .app_data(sessions.clone())
            .app_data(forwarder.clone())
            .app_data(web::PayloadConfig::new(max_body_bytes))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(settings: &RelaySettings) {
    let rule = "=".repeat(70);
    println!("\n{rule}");
    println!("🚀 Motor.com M1 Proxy Server v{VERSION}");
    println!("{rule}");
    println!("\n📡 Server running on: http://{}\n", settings.get_bind_address());

    let auth = &settings.auth;
    println!(
        "🔐 Authentication Mode: {}",
        if auth.auto_auth { "AUTOMATIC" } else { "MANUAL" }
    );
    if auth.auto_auth {
        println!("   Card Number: {}", auth.card_number);
        println!(
            "   Password: {}\n",
            if auth.password.is_empty() {
                "⚠️  NOT SET!"
            } else {
                "***SET***"
            }
        );
        if auth.password.is_empty() {
            println!("⚠️  WARNING: Password not configured!");
            println!("   Set EBSCO_PASSWORD or configure auth.password in Settings.toml\n");
        }
    }
}

fn print_endpoints(settings: &RelaySettings) {
    let bind_address = settings.get_bind_address();
    println!("📡 Available endpoints:");
    println!("   Motor.com Proxy: *    http://{bind_address}/api/motor-proxy/*");
    println!("                         Upstream: {}", settings.proxy.motor_base_url);
    println!("   EBSCO Proxy:     *    http://{bind_address}/api/ebsco-proxy/*");
    println!("   Manual Auth:     POST http://{bind_address}/api/auth/ebsco");
    println!("   Health Check:    GET  http://{bind_address}/health\n");

    if settings.auth.auto_auth_ready() {
        println!("✅ Frontend requests will be automatically authenticated!");
        println!("   No need to pass X-Auth-Token headers.\n");
    } else {
        println!("ℹ️  Manual authentication required for requests.\n");
    }
    println!("{}\n", "=".repeat(70));
}
