pub mod ci_filter;
pub mod db_utils;
pub mod template_cache;
pub mod validation;

use actix_web::HttpRequest;

/// Client address as reported by the proxy headers, falling back to the peer.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}
