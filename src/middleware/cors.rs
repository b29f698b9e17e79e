use actix_web::{
    dev::ServiceRequest,
    http::header::{self, HeaderMap, HeaderValue},
    http::Method,
    HttpResponse,
};

/// CORS for a single trusted browser origin
///
/// Preflight requests are answered directly and never reach a handler.
pub struct Cors {
    allowed_origin: HeaderValue,
}

impl Cors {
    /// `None` when the origin is not a valid header value.
    pub fn new(allowed_origin: &str) -> Option<Self> {
        HeaderValue::from_str(allowed_origin)
            .ok()
            .map(|allowed_origin| Self { allowed_origin })
    }
}

impl crate::middleware::Interceptor for Cors {
    fn intercept(&self, req: &ServiceRequest) -> Result<(), HttpResponse> {
        if req.method() != Method::OPTIONS {
            return Ok(());
        }

        Err(HttpResponse::Ok()
            .insert_header((header::ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"))
            .insert_header((
                header::ACCESS_CONTROL_ALLOW_METHODS,
                "GET, POST, PUT, PATCH, DELETE, OPTIONS",
            ))
            .insert_header((
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "Accept, Authorization, Content-Type, X-CSRF-Token",
            ))
            .finish())
    }

    fn decorate(&self, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone());
    }
}
