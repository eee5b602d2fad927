use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use clap::Parser;
use rust_decimal::Decimal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use course_purchases::config::Config;
use course_purchases::crypto::generate_api_token;
use course_purchases::db::{create_pool, init_db, queries, AppState};
use course_purchases::error::Result;
use course_purchases::handlers;
use course_purchases::models::{CreateCourse, CreateLecture, CreateUser};
use course_purchases::payments::{CashfreeClient, SkipVerification, WebhookVerifier};

#[derive(Parser, Debug)]
#[command(name = "course-purchases")]
#[command(about = "Checkout and payment reconciliation for a course marketplace")]
struct Cli {
    /// Seed the database with dev data (creator, buyer, course with lectures)
    #[arg(long)]
    seed: bool,
}

/// Seeds the database with a creator, a buyer and one course.
/// Only runs in dev mode and when the database has no users.
fn seed_dev_data(state: &AppState) -> Result<()> {
    let conn = state.db.get()?;

    if queries::count_users(&conn)? > 0 {
        tracing::info!("Database already has data, skipping seed");
        return Ok(());
    }

    let creator_token = generate_api_token();
    let creator = queries::create_user(
        &conn,
        &CreateUser {
            name: "Dev Creator".to_string(),
            email: "creator@courses.local".to_string(),
        },
        Some(&creator_token),
    )?;

    let buyer_token = generate_api_token();
    let buyer = queries::create_user(
        &conn,
        &CreateUser {
            name: "Dev Buyer".to_string(),
            email: "buyer@courses.local".to_string(),
        },
        Some(&buyer_token),
    )?;

    let course = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Rust for Web Developers".to_string(),
            price: Decimal::new(499, 0),
            creator_id: creator.id.clone(),
        },
    )?;

    let lectures = [("Introduction", true), ("Ownership", false), ("Async", false)];
    for (title, is_preview_free) in lectures {
        queries::create_lecture(
            &conn,
            &course.id,
            &CreateLecture {
                title: title.to_string(),
                is_preview_free,
            },
        )?;
    }

    tracing::info!("Seeded creator {}, buyer {}, course {}", creator.id, buyer.id, course.id);

    // Copy-paste friendly output
    println!();
    println!("--- COPY FROM HERE ---");
    println!("  creator_token: {}", creator_token);
    println!("  buyer_token: {}", buyer_token);
    println!("  course_id: {}", course.id);
    println!("--- END COPY ---");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "course_purchases=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let cashfree =
        Arc::new(CashfreeClient::new(&config.cashfree).expect("Failed to build Cashfree client"));

    let skip_verification = config.skip_webhook_verification && config.dev_mode;
    if config.skip_webhook_verification && !config.dev_mode {
        tracing::warn!("SKIP_WEBHOOK_VERIFICATION ignored: not in dev mode (set APP_ENV=dev)");
    }

    let webhook_verifier: Arc<dyn WebhookVerifier> = if skip_verification {
        tracing::warn!("Webhook signature verification DISABLED (SKIP_WEBHOOK_VERIFICATION)");
        Arc::new(SkipVerification)
    } else {
        cashfree.clone()
    };

    let state = AppState {
        db: db_pool,
        gateway: cashfree,
        webhook_verifier,
        checkout: config.checkout.clone(),
        purchased_policy: config.purchased_policy,
        unlock_previews_on_purchase: config.unlock_previews_on_purchase,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set APP_ENV=dev)");
        } else if let Err(e) = seed_dev_data(&state) {
            tracing::error!("Failed to seed dev data: {}", e);
        }
    }

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1/purchase", handlers::router(state.clone()))
        .layer(TraceLayer::new_for_http());

    if let Some(ref origin) = config.cors_origin {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => {
                app = app.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_methods(tower_http::cors::Any)
                        .allow_headers(tower_http::cors::Any),
                );
            }
            Err(_) => tracing::warn!("Ignoring invalid CORS_ORIGIN: {}", origin),
        }
    }

    let app = app.with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Course purchase server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
