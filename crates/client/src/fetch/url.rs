//! Mapping intercepted URLs onto the upstream server.

/// Error type for upstream URL mapping failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

/// Rebase the path and query of `request` onto `upstream`.
///
/// The upstream's own path acts as a mount point: with upstream
/// `http://backend:3000/app/`, `https://site.test/style.css?v=2` maps to
/// `http://backend:3000/app/style.css?v=2`. The fragment is dropped and the
/// query is passed on untouched, volatile parameters included.
pub fn rebase(upstream: &url::Url, request: &url::Url) -> Result<url::Url, UrlError> {
    match upstream.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let mount = upstream.path().trim_end_matches('/');
    let path = format!("{mount}{}", request.path());

    let mut target = upstream.clone();
    target.set_path(&path);
    target.set_query(request.query());
    target.set_fragment(None);

    Ok(target)
}
