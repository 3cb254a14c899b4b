use std::sync::Arc;

use dotenv::dotenv;
use log::*;

mod api_models;
mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod service;
mod storage;
mod validation;

use crate::config::Settings;
use crate::service::PollService;
use crate::storage::Storage;

/**
 * Struct for carrying application state into tide request handlers
 */
#[derive(Clone)]
pub struct AppState {
    pub polls: PollService,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, admin_token: Option<String>) -> Self {
        AppState {
            polls: PollService::new(storage),
            admin_token,
        }
    }
}

#[async_std::main]
async fn main() -> Result<(), std::io::Error> {
    dotenv().ok();
    pretty_env_logger::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            error!("Could not load settings! {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
        }
    };

    match storage::open(&settings).await {
        Ok(storage) => {
            if settings.admin_token.is_none() {
                warn!("ADMIN_TOKEN is not set, every admin request will be refused");
            }
            let state = AppState::new(storage, settings.admin_token.clone());
            let app = routes::server(state);
            info!("Listening on {}", settings.listen_addr);
            app.listen(settings.listen_addr.clone()).await?;
            Ok(())
        }
        Err(err) => {
            error!("Could not initialize storage! {:?}", err);
            Err(std::io::Error::new(std::io::ErrorKind::Other, err))
        }
    }
}
