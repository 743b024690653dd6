pub mod templates;

use crate::charts;
use crate::heatmap::{self, HeatmapConfig};
use crate::import_data::{self, TrackFormat};
use crate::track::Track;
use crate::utils;
use actix_multipart::Multipart;
use actix_web::dev::Service;
use actix_web::error::{ErrorBadRequest, ErrorInternalServerError, ErrorPayloadTooLarge};
use actix_web::{http::header, web, App, HttpRequest, HttpResponse, HttpServer};
use base64::{engine::general_purpose, Engine as _};
use futures_util::TryStreamExt;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 4 * 1024 * 1024;
const UPLOAD_FIELD: &str = "file";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_folder: PathBuf,
    pub max_content_length: usize,
    pub heatmap_config: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_folder: std::env::temp_dir(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            heatmap_config: PathBuf::from("static/heatmap.yml"),
        }
    }
}

/// An uploaded activity file, removed from disk when dropped.
struct Upload {
    path: PathBuf,
}

impl Upload {
    fn load_track(&self) -> anyhow::Result<Track> {
        import_data::load_track(&self.path)
    }
}

impl Drop for Upload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove upload {}: {}", self.path.display(), e);
        }
    }
}

fn redirect_to_self(req: &HttpRequest) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, req.uri().to_string()))
        .finish()
}

fn html(page: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

fn declared_length(req: &HttpRequest) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Stores the `file` field of the form in the upload folder. `None` when the
/// file name is not an accepted activity file.
async fn receive_upload(
    req: &HttpRequest,
    mut payload: Multipart,
    config: &ServerConfig,
) -> actix_web::Result<Option<Upload>> {
    if declared_length(req).is_some_and(|len| len > config.max_content_length) {
        return Err(ErrorPayloadTooLarge("upload exceeds the maximum content length"));
    }

    let mut received = 0usize;
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let is_file = disposition.and_then(|cd| cd.get_name()) == Some(UPLOAD_FIELD);
        let filename = disposition
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            received += chunk.len();
            if received > config.max_content_length {
                return Err(ErrorPayloadTooLarge("upload exceeds the maximum content length"));
            }
            if is_file {
                data.extend_from_slice(&chunk);
            }
        }
        if !is_file {
            continue;
        }

        let Some(filename) = filename else {
            return Ok(None);
        };
        if TrackFormat::from_path(Path::new(&filename)).is_none() {
            info!("rejecting upload {}", filename);
            return Ok(None);
        }
        let path = config.upload_folder.join(format!(
            "{}_{}",
            utils::token_hex(8),
            utils::secure_filename(&filename)
        ));
        tokio::fs::write(&path, &data)
            .await
            .map_err(ErrorInternalServerError)?;
        debug!("stored upload {} ({} bytes)", path.display(), data.len());
        return Ok(Some(Upload { path }));
    }
    Err(ErrorBadRequest("missing file field"))
}

async fn index() -> HttpResponse {
    html(templates::index())
}

async fn heatmap_form() -> HttpResponse {
    html(templates::upload("Heatmap", "/heatmap"))
}

async fn speed_form() -> HttpResponse {
    html(templates::upload("Speed Graphs", "/speed"))
}

async fn create_heatmap(
    req: HttpRequest,
    payload: Multipart,
    config: web::Data<ServerConfig>,
) -> actix_web::Result<HttpResponse> {
    let Some(upload) = receive_upload(&req, payload, &config).await? else {
        return Ok(redirect_to_self(&req));
    };
    let heatmap_config = config.heatmap_config.clone();
    let page = web::block(move || -> anyhow::Result<String> {
        let track = upload.load_track()?;
        let config = HeatmapConfig::load(&heatmap_config)?;
        let img = heatmap::heatmap_from_track(&track, &config)?;
        let jpeg = heatmap::jpeg_bytes(&img)?;
        Ok(templates::show_heatmap(&general_purpose::STANDARD.encode(jpeg)))
    })
    .await
    .map_err(ErrorInternalServerError)?
    .map_err(|e| {
        error!("heatmap failed: {:?}", e);
        ErrorInternalServerError(e)
    })?;
    Ok(html(page))
}

async fn create_speed_plots(
    req: HttpRequest,
    payload: Multipart,
    config: web::Data<ServerConfig>,
) -> actix_web::Result<HttpResponse> {
    let Some(upload) = receive_upload(&req, payload, &config).await? else {
        return Ok(redirect_to_self(&req));
    };
    let page = web::block(move || -> anyhow::Result<String> {
        let track = upload.load_track()?;
        let speed_terrain = charts::web_plot_speed_elevation(&track)?;
        let speed_terrain_kde = charts::web_plot_speed_climb_kde(&track)?;
        Ok(templates::show_graph(
            "Speed Graphs",
            &speed_terrain,
            &speed_terrain_kde,
        ))
    })
    .await
    .map_err(ErrorInternalServerError)?
    .map_err(|e| {
        error!("speed graphs failed: {:?}", e);
        ErrorInternalServerError(e)
    })?;
    Ok(html(page))
}

/// Registers the GUI routes. Handlers expect a `web::Data<ServerConfig>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/heatmap")
                .route(web::get().to(heatmap_form))
                .route(web::post().to(create_heatmap)),
        )
        .service(
            web::resource("/speed")
                .route(web::get().to(speed_form))
                .route(web::post().to(create_speed_plots)),
        );
}

/// Serves the GUI until the server is stopped.
pub fn run_webserver(config: ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.upload_folder)?;
    let (host, port) = (config.host.clone(), config.port);
    let data = web::Data::new(config);

    let runtime = Runtime::new()?;
    runtime.block_on(async move {
        info!("Setting up server routes...");
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .wrap_fn(|req, srv| {
                    info!("Incoming request: {} {}", req.method(), req.uri());
                    srv.call(req)
                })
                .configure(configure)
        })
        .bind((host.as_str(), port))?;

        for addr in server.addrs() {
            info!("Server bound successfully to http://{}", addr);
        }
        server.run().await
    })?;
    Ok(())
}
