pub mod test_utils;
use crate::test_utils::{write_heatmap_config, SAMPLE_GPX, SAMPLE_TCX};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use std::fs;
use std::path::Path;
use tempdir::TempDir;
use track_viz::webserver::{self, ServerConfig};

const BOUNDARY: &str = "----trackvizboundary";

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn server_config(dir: &Path) -> ServerConfig {
    let uploads = dir.join("uploads");
    fs::create_dir_all(&uploads).unwrap();
    ServerConfig {
        upload_folder: uploads,
        heatmap_config: write_heatmap_config(dir, 200, 100, ""),
        ..ServerConfig::default()
    }
}

fn uploads_left(dir: &Path) -> usize {
    fs::read_dir(dir.join("uploads")).unwrap().count()
}

fn upload_request(uri: &str, field: &str, filename: &str, content: &[u8]) -> test::TestRequest {
    let (content_type, body) = multipart_body(field, filename, content);
    test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
}

macro_rules! init_app {
    ($config:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($config))
                .configure(webserver::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn forms() {
    let dir = TempDir::new("track-viz").unwrap();
    let app = init_app!(server_config(dir.path()));

    let index = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
    let index = String::from_utf8(index.to_vec()).unwrap();
    assert!(index.contains("href=\"/heatmap\"") && index.contains("href=\"/speed\""));

    for uri in ["/heatmap", "/speed"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(page.contains("enctype=\"multipart/form-data\""));
        assert!(page.contains(&format!("action=\"{uri}\"")));
    }
}

#[actix_web::test]
async fn speed_graphs() {
    let dir = TempDir::new("track-viz").unwrap();
    let app = init_app!(server_config(dir.path()));

    let gpx = fs::read(SAMPLE_GPX).unwrap();
    let req = upload_request("/speed", "file", "morning run.gpx", &gpx).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(page.contains("<title>Speed Graphs</title>"));
    assert_eq!(page.matches("<svg").count(), 2);
    assert_eq!(uploads_left(dir.path()), 0);
}

#[actix_web::test]
async fn heatmap_page() {
    let dir = TempDir::new("track-viz").unwrap();
    let app = init_app!(server_config(dir.path()));

    let tcx = fs::read(SAMPLE_TCX).unwrap();
    let req = upload_request("/heatmap", "file", "run.tcx", &tcx).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    // base64 of the JPEG magic bytes
    assert!(page.contains("src=\"data:image/jpeg;base64,/9j/"));
    assert_eq!(uploads_left(dir.path()), 0);
}

#[actix_web::test]
async fn wrong_suffix_redirects() {
    let dir = TempDir::new("track-viz").unwrap();
    let app = init_app!(server_config(dir.path()));

    for filename in ["run.csv", "run.GPX", "gpx"] {
        let req = upload_request("/speed", "file", filename, b"data").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "{filename}");
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/speed");
    }
    assert_eq!(uploads_left(dir.path()), 0);
}

#[actix_web::test]
async fn rejected_uploads() {
    let dir = TempDir::new("track-viz").unwrap();
    let config = ServerConfig {
        max_content_length: 512,
        ..server_config(dir.path())
    };
    let app = init_app!(config);

    let gpx = fs::read(SAMPLE_GPX).unwrap();
    let req = upload_request("/speed", "file", "run.gpx", &gpx).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let req = upload_request("/speed", "track", "run.gpx", b"<gpx/>").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = upload_request("/heatmap", "file", "run.gpx", b"not xml").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(uploads_left(dir.path()), 0);
}
