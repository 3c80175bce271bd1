use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::header::CONTENT_TYPE;
use hyper::{Body, Method, Request, Response, Server};
use log::{debug, info};
use tower::make::Shared;
use tower_http::cors::{Any, CorsLayer};

use super::api::ProxyApi;

const TOKEN_COLLECTIONS: [&str; 2] = ["tokens", "nfts"];
const IMAGE_LEAVES: [&str; 5] = ["image", "image.gif", "image.png", "image.jpg", "image.jpeg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ping,
    Stats,
    Metadata { id: String, nocache: bool },
    Image(String),
    Media(String),
    NotFound,
}

impl Route {
    pub fn parse(method: &Method, path: &str, query: Option<&str>) -> Route {
        if method != Method::GET && method != Method::HEAD {
            return Route::NotFound;
        }
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["ping"] => Route::Ping,
            ["stats"] => Route::Stats,
            ["v1", collection, id] if is_token_route(collection, id) => Route::Metadata {
                id: id.to_string(),
                nocache: query.map(nocache_requested).unwrap_or(false),
            },
            ["v1", collection, id, leaf] if is_token_route(collection, id) => {
                if IMAGE_LEAVES.contains(leaf) {
                    Route::Image(id.to_string())
                } else if *leaf == "media" {
                    Route::Media(id.to_string())
                } else {
                    Route::NotFound
                }
            }
            _ => Route::NotFound,
        }
    }
}

fn is_token_route(collection: &str, id: &str) -> bool {
    TOKEN_COLLECTIONS.contains(&collection) && !id.is_empty()
}

fn nocache_requested(query: &str) -> bool {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == "nocache" && parse_flag(value))
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

pub async fn dispatch(api: &ProxyApi, request: Request<Body>) -> Response<Body> {
    let route = Route::parse(request.method(), request.uri().path(), request.uri().query());
    debug!("{} {} -> {:?}", request.method(), request.uri(), route);
    match route {
        Route::Ping => api.ping(),
        Route::Stats => api.stats_response().await,
        Route::Metadata { id, nocache } => api.token_metadata(&id, nocache).await,
        Route::Image(id) => api.token_image(&id).await,
        Route::Media(id) => api.token_media(&id).await,
        Route::NotFound => api.not_found(),
    }
}

pub async fn run_server(api: ProxyApi, port: u16) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD])
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE]);
    let api = Arc::new(api);
    let service = tower::ServiceBuilder::new()
        .layer(cors)
        .service_fn(move |request: Request<Body>| {
            let api = api.clone();
            async move { Ok::<_, Infallible>(dispatch(&api, request).await) }
        });

    let server = Server::try_bind(&addr)?.serve(Shared::new(service));
    info!("Serving media on {}", addr);
    server
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down media server");
        })
        .await?;
    Ok(())
}
