use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use futures_util::future::BoxFuture;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tower::{Service, ServiceExt};
use tower_http::{
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;

/// Characters left as-is in listing links.
const LINK: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn create_routes(config: &ServerConfig) -> Router {
    let files = ServeDir::new(&config.root)
        .append_index_html_on_directories(true)
        .fallback(Fallback::new(config));

    let router = Router::new().fallback_service(files);

    let router = if config.no_cache {
        router.layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

/// Handles whatever `ServeDir` could not: directories without an index get a
/// listing, client-side routes optionally get `index.html`, the rest is 404.
#[derive(Clone)]
struct Fallback {
    root: PathBuf,
    spa_index: Option<ServeFile>,
}

impl Fallback {
    fn new(config: &ServerConfig) -> Self {
        Self {
            root: config.root.clone(),
            spa_index: config
                .spa_fallback
                .then(|| ServeFile::new(config.root.join("index.html"))),
        }
    }
}

impl Service<Request<Body>> for Fallback {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let root = self.root.clone();
        let spa_index = self.spa_index.clone();

        Box::pin(async move {
            let path = req.uri().path().to_owned();

            if path.ends_with('/') {
                if let Some(dir) = resolve(&root, &path) {
                    if let Ok(listing) = list_directory(&dir, &path).await {
                        return Ok(listing);
                    }
                }
            }

            // Anything with an extension is a real asset that is missing.
            match spa_index {
                Some(index) if Path::new(&path).extension().is_none() => {
                    match index.oneshot(req).await {
                        Ok(res) => Ok(res.map(Body::new)),
                        Err(err) => match err {},
                    }
                }
                _ => Ok(StatusCode::NOT_FOUND.into_response()),
            }
        })
    }
}

/// Map a request path onto `root`, refusing anything that would leave it.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path.trim_start_matches('/'))
        .decode_utf8()
        .ok()?;
    let mut dir = root.to_path_buf();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => dir.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    dir.is_dir().then_some(dir)
}

async fn list_directory(dir: &Path, uri_path: &str) -> std::io::Result<Response> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort_by_key(|name| name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(uri_path));
    let mut page = format!(
        "<!DOCTYPE HTML>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );
    for name in &entries {
        let link = match name.strip_suffix('/') {
            Some(dir_name) => format!("{}/", utf8_percent_encode(dir_name, LINK)),
            None => utf8_percent_encode(name, LINK).to_string(),
        };
        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            link,
            escape_html(name)
        ));
    }
    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Ok(Html(page).into_response())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
