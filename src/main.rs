use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use log::info;

use cambio::config::Config;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let state = web::Data::new(cambio::build_state(&config)?);
    info!(
        "Rate sources: {}",
        state.resolver.source_ids().join(" -> ")
    );
    info!("Listening on {}", config.listen_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(cambio::api::configure)
    })
    .bind(config.listen_addr)
    .with_context(|| format!("failed to bind {}", config.listen_addr))?
    .run()
    .await?;

    Ok(())
}
