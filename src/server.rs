//! HTTP front end serving identicons as PNG.
//!
//! One route, `GET /identicon/generate?name=<name>`. Rendering is CPU-bound
//! and runs on tokio's blocking pool so request handling stays responsive.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::identicon::generate;
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use tracing::{error, info};
use warp::http::StatusCode;
use warp::http::header::{ALLOW, CONTENT_TYPE};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Decodes one `application/x-www-form-urlencoded` component to raw bytes.
///
/// Invalid UTF-8 is kept as-is so the identicon matches the bytes the client sent.
fn decode_component(component: &str) -> Vec<u8> {
    percent_decode_str(&component.replace('+', " ")).collect()
}

/// First `name` value in the query, if present and non-empty.
pub fn name_param(query: &str) -> Option<Vec<u8>> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key) == b"name").then(|| decode_component(value))
        })
        .filter(|name| !name.is_empty())
}

fn text(status: StatusCode, message: &'static str) -> Response {
    warp::reply::with_status(message, status).into_response()
}

/// Answers a generate request for the raw query string.
async fn generate_reply(query: String) -> Result<Response, Infallible> {
    let Some(name) = name_param(&query) else {
        return Ok(text(StatusCode::PRECONDITION_FAILED, "no name given\n"));
    };

    info!("generating identicon for {}", String::from_utf8_lossy(&name));
    let rendered = tokio::task::spawn_blocking(move || generate(&name).to_png()).await;
    let reply = match rendered {
        Ok(Ok(png)) => warp::reply::with_header(png, CONTENT_TYPE, "image/png").into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed generating identicon");
            text(StatusCode::INTERNAL_SERVER_ERROR, "failed generating identicon\n")
        }
        Err(e) => {
            error!(error = %e, "render task failed");
            text(StatusCode::INTERNAL_SERVER_ERROR, "failed generating identicon\n")
        }
    };
    Ok(reply)
}

/// Maps unmatched requests to plain-text errors.
async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let reply = if err.is_not_found() {
        text(StatusCode::NOT_FOUND, "404 page not found\n")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        let reply = text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n");
        warp::reply::with_header(reply, ALLOW, "GET").into_response()
    } else {
        text(StatusCode::BAD_REQUEST, "bad request\n")
    };
    Ok(reply)
}

/// The complete filter tree, including error mapping.
pub fn routes()
-> impl Filter<Extract = (Response,), Error = Infallible> + Clone + Send + Sync + 'static {
    warp::path!("identicon" / "generate")
        .and(warp::get())
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and_then(generate_reply)
        .recover(handle_rejection)
        .unify()
}

/// Resolves the configured `host:port` to the first usable socket address.
pub fn resolve_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let addr = config.bind_addr();
    (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|source| ServerError::Resolve {
            addr: addr.clone(),
            source,
        })?
        .next()
        .ok_or(ServerError::NoAddress { addr })
}

/// Binds the listener and returns the bound address with the serving future.
///
/// Must be called inside a tokio runtime. The future completes once
/// `shutdown` resolves and in-flight requests have finished.
pub fn bind<S>(
    addr: SocketAddr,
    shutdown: S,
) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static), ServerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    warp::serve(routes())
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serves until Ctrl-C.
pub async fn run(config: &ServerConfig) -> Result<(), ServerError> {
    let addr = resolve_addr(config)?;
    let (bound, server) = bind(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed listening for shutdown signal");
        }
    })?;
    info!(addr = %bound, workers = config.workers, "listening");
    server.await;
    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identicon::Identicon;

    async fn get(path: &str) -> warp::http::Response<warp::hyper::body::Bytes> {
        warp::test::request().method("GET").path(path).reply(&routes()).await
    }

    #[tokio::test]
    async fn generate_returns_png() {
        let res = get("/identicon/generate?name=banner").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(&res.body()[..], Identicon::new("banner").to_png().unwrap());
    }

    #[tokio::test]
    async fn name_is_form_decoded() {
        let res = get("/identicon/generate?name=john+doe%21").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(&res.body()[..], Identicon::new("john doe!").to_png().unwrap());
    }

    #[tokio::test]
    async fn non_utf8_name_hashes_raw_bytes() {
        let res = get("/identicon/generate?name=%FF").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(&res.body()[..], generate(&[0xff]).to_png().unwrap());
        assert_ne!(&res.body()[..], Identicon::new("\u{fffd}").to_png().unwrap());
    }

    #[tokio::test]
    async fn missing_or_empty_name_is_precondition_failure() {
        for path in [
            "/identicon/generate",
            "/identicon/generate?name=",
            "/identicon/generate?other=1",
            "/identicon/generate?name=&name=later",
        ] {
            let res = get(path).await;
            assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED, "{}", path);
            assert_eq!(&res.body()[..], b"no name given\n");
        }
    }

    #[tokio::test]
    async fn unknown_path_and_method() {
        let res = get("/favicon.ico").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = warp::test::request()
            .method("POST")
            .path("/identicon/generate?name=a")
            .reply(&routes())
            .await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET");
    }

    #[test]
    fn name_param_takes_first_name() {
        assert_eq!(name_param("a=1&name=x%20y&name=z"), Some(b"x y".to_vec()));
        assert_eq!(name_param("n%61me=encoded+key"), Some(b"encoded key".to_vec()));
        assert_eq!(name_param("name"), None);
        assert_eq!(name_param(""), None);
    }

    #[test]
    fn resolves_configured_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            workers: 1,
        };
        assert_eq!(resolve_addr(&config).unwrap(), "127.0.0.1:8080".parse().unwrap());
    }
}
