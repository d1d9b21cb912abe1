//! threadseek: thread-aware search over a chat export.
//!
//! Messages are grouped into reply-threads, each thread becomes one document
//! in a relevance index (sparse TF-IDF or dense sentence embeddings), and
//! queries return the best-matching message of each relevant thread. Built
//! artifacts are cached on disk and reloaded on startup.

pub mod error;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod search;
pub mod threading;

use std::sync::Once;

use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::openapi_get_routes;
use tokio::sync::RwLock;

use crate::search::{EmbeddingClient, EmbeddingConfig, SearchConfig, SearchEngine, SearchMode};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Ensure the cache directory exists before the index fairing runs.
    let config = SearchConfig::from_env();
    std::fs::create_dir_all(&config.cache_dir).expect("Failed to create cache directory");
    log::info!("cache directory initialized at {}", config.cache_dir.display());

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(cors)
        .attach(AdHoc::try_on_ignite("Build Search Index", |rocket| async move {
            let config = SearchConfig::from_env();

            let embedding_client = match config.mode {
                SearchMode::Semantic => {
                    match EmbeddingClient::new(EmbeddingConfig::from_env()) {
                        Ok(client) => {
                            if let Err(err) = client.healthcheck().await {
                                log::warn!(
                                    "embedding service health check failed: {}. Continuing with best-effort semantic search.",
                                    err
                                );
                            }
                            Some(client)
                        }
                        Err(err) => {
                            log::error!("failed to initialize embedding client: {}", err);
                            return Err(rocket);
                        }
                    }
                }
                SearchMode::Lexical => None,
            };

            match SearchEngine::open_or_build(&config, embedding_client).await {
                Ok(engine) => Ok(rocket.manage(RwLock::new(engine)).manage(config)),
                Err(err) => {
                    log::error!("failed to initialize search index: {}", err);
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/",
            openapi_get_routes![
                routes::health::health_check,
                routes::search::search,
                routes::admin::reset_cache,
            ],
        )
        .mount(
            "/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../openapi.json".to_owned(),
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use tokio::sync::RwLock;

    use crate::search::{SearchConfig, SearchEngine};

    /// Builder for Rocket instances tailored for integration tests: random
    /// port, logging off, no startup fairings, explicitly provided state.
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        engine: Option<SearchEngine>,
        config: Option<SearchConfig>,
    }

    impl TestRocketBuilder {
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                engine: None,
                config: None,
            }
        }

        /// Mount routes at the application root.
        pub fn mount_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/".to_string(), routes));
            self
        }

        /// Manage a pre-built search engine for routes that need one.
        pub fn manage_engine(mut self, engine: SearchEngine) -> Self {
            self.engine = Some(engine);
            self
        }

        /// Manage an explicit search configuration.
        pub fn manage_config(mut self, config: SearchConfig) -> Self {
            self.config = Some(config);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(engine) = self.engine {
                rocket = rocket.manage(RwLock::new(engine));
            }

            if let Some(config) = self.config {
                rocket = rocket.manage(config);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }
    }

    impl Default for TestRocketBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
