//! Static HTTP preview server over the output directory.
//!
//! A passive file server for manual preview while watching: GET and HEAD
//! only, no dynamic behavior, no caching headers. Directory requests resolve
//! to their `index.html`. Requests escaping the served root are rejected.
//!
//! Note that the watcher writes into the same directory this serves from; a
//! request racing a rebuild can observe a partially-written file. That is
//! acceptable for a local preview and not worth a locking discipline.

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server};

use crate::output;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("could not bind preview server on port {port}: {detail}")]
    Bind { port: u16, detail: String },
}

/// Resolve a request URL to a file under `root`.
///
/// Returns `None` for anything that should 404: traversal attempts,
/// missing files, directories without an `index.html`.
pub fn resolve_path(root: &Path, url: &str) -> Option<PathBuf> {
    // Strip the query string; the file system doesn't care.
    let path_part = url.split('?').next().unwrap_or(url);

    let relative = path_part.trim_start_matches('/');
    let relative = Path::new(relative);

    // Reject anything that isn't a plain forward path. This catches `..`
    // traversal and absolute paths smuggled into the URL.
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let mut path = root.join(relative);
    if path.is_dir() {
        path = path.join("index.html");
    }
    path.is_file().then_some(path)
}

/// Content type from file extension, covering everything the build emits.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve `root` on the local port, blocking forever.
pub fn serve(root: &Path, port: u16) -> Result<(), ServeError> {
    let server = Server::http(("127.0.0.1", port)).map_err(|e| ServeError::Bind {
        port,
        detail: e.to_string(),
    })?;
    output::print_serving(root, port);

    for request in server.incoming_requests() {
        handle(root, request);
    }
    Ok(())
}

/// Serve on a background thread. Bind errors are reported from the thread;
/// the preview server failing must not take the watcher down with it.
pub fn spawn(root: PathBuf, port: u16) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(error) = serve(&root, port) {
            output::print_error(&error.to_string());
        }
    })
}

fn handle(root: &Path, request: tiny_http::Request) {
    let respond = |request: tiny_http::Request, response: Response<_>| {
        if let Err(error) = request.respond(response) {
            output::print_warning(&format!("preview response failed: {error}"));
        }
    };

    match request.method() {
        Method::Get | Method::Head => {}
        _ => {
            respond(request, Response::empty(405).boxed());
            return;
        }
    }

    let Some(path) = resolve_path(root, request.url()) else {
        respond(
            request,
            Response::from_string("not found").with_status_code(404).boxed(),
        );
        return;
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(error) => {
            output::print_warning(&format!("preview read failed: {error}"));
            respond(request, Response::empty(500).boxed());
            return;
        }
    };

    let mut response = Response::from_file(file).boxed();
    if let Ok(header) =
        Header::from_bytes(&b"Content-Type"[..], content_type_for(&path).as_bytes())
    {
        response = response.with_header(header);
    }
    respond(request, response);
}
