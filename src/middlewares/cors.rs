use actix_cors::Cors;
use actix_web::http::header;

/// Bearer tokens travel in the `Authorization` header, so no cookies or
/// credentials are involved.
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600)
}
