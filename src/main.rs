use std::sync::Mutex;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vertscale::config::Config;
use vertscale::server::{self, Session};

fn load_session(config: &Config) -> Result<Session> {
    let mut session = Session::new();
    for path in &config.load {
        let obj = obj::Obj::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = session
            .load_obj(&name, &obj.data)
            .with_context(|| format!("failed to add {}", path.display()))?;
        if session.scene.active().is_none() {
            session.scene.set_active(Some(id))?;
        }
    }
    Ok(session)
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .init();

    let session = web::Data::new(Mutex::new(load_session(&config)?));

    info!(host = %config.host, port = config.port, "listening");
    HttpServer::new(move || {
        App::new()
            .app_data(session.clone())
            .configure(server::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
