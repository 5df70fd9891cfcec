use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use tracing::info;

use gistlink::config::AppConfig;
use gistlink::remote::RemoteStore;
use gistlink::remote::http::HttpRemoteStore;
use gistlink::services::links::LinkService;
use gistlink::services::redirect::RedirectService;
use gistlink::services::uploads::UploadApiService;
use gistlink::store::SlugStore;
use gistlink::store::clicks::ClickManager;
use gistlink::system::logging::init_logging;
use gistlink::upload::UploadService;

const CLICK_FLUSH_INTERVAL_SECS: u64 = 10;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config =
        AppConfig::from_env().map_err(|e| std::io::Error::other(e.format_simple()))?;
    let _guard = init_logging(&config.logging);

    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(&config.remote));
    let store = Arc::new(SlugStore::new(
        remote.clone(),
        &config.remote.document_id,
        &config.remote.document_file,
        &config.server.public_origin,
    ));
    let uploads = Arc::new(UploadService::new(remote.clone(), &config.remote.branch));
    let clicks = Arc::new(ClickManager::new(
        store.clone(),
        Duration::from_secs(CLICK_FLUSH_INTERVAL_SECS),
    ));
    tokio::spawn(clicks.clone().run());

    info!(
        "gistlink listening on {}:{} (remote backend: {})",
        config.server.host,
        config.server.port,
        remote.backend_name()
    );

    let bind = (config.server.host.clone(), config.server.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(uploads.clone()))
            .app_data(web::Data::new(clicks.clone()))
            .route("/r/{slug}", web::get().to(RedirectService::handle_redirect))
            .route("/api/links", web::post().to(LinkService::create_link))
            .route("/api/links/{slug}", web::get().to(LinkService::get_link))
            .route("/api/uploads", web::post().to(UploadApiService::upload))
            .route(
                "/api/uploads/batch",
                web::post().to(UploadApiService::upload_batch),
            )
            .route(
                "/api/uploads/{key}",
                web::delete().to(UploadApiService::delete),
            )
    })
    .bind(bind)?
    .run()
    .await
}
