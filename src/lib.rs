#[macro_use]
extern crate rocket;

use error::BackendError;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{Config, StoreBackend};
use crate::data::store::{MemoryStore, MongoStore, Store};
use crate::error::ConfigurationError;
use crate::route::mount_api;

pub mod config;
pub mod data;
pub mod enrollment;
pub mod error;
pub mod resp;
pub mod role;
pub mod route;
pub mod util;

pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(l).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        };
        if let Err(err) = tracing_log::LogTracer::init() {
            eprintln!("Unable to forward log records: {}", err);
        }
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            c
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            c
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            return Err(other.into());
        }
    };

    let store = match c.store {
        StoreBackend::MongoDb => {
            tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
            match MongoStore::connect(&c.mongodb_uri, &c.mongodb_db).await {
                Ok(it) => Store::from(it),
                Err(e) => {
                    tracing::error!("Unable to connect to MongoDB: {}", e);
                    return Err(e.into());
                }
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store. Data won't survive a restart.");
            Store::from(MemoryStore::new())
        }
    };
    tracing::info!("Enrollment policy: {:?}", c.enroll_policy);

    build(c, store)
}

/// Assembles the HTTP server around an already connected store.
pub fn build(c: Config, store: Store) -> Result<Rocket<Build>, BackendError> {
    tracing::info!("Starting HTTP server on port {}...", c.port);
    let figment = rocket::Config::figment().merge(("port", c.port));
    let mut r = rocket::custom(figment).manage(c).manage(store);

    tracing::info!("Setting up CORS...");
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![
            Method::Get,
            Method::Put,
            Method::Patch,
            Method::Post,
            Method::Delete,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    r = r.attach(cors);
    r = mount_api(r);

    Ok(r)
}
