use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{RefreshHandler, SessionIssuer, TokenCodec};
use crate::clock::Clock;
use crate::configuration::{ApplicationSettings, JwtSettings};
use crate::logger::LoggerMiddleware;
use crate::middleware::{BearerGuard, Cors, InterceptorChain};
use crate::routes::{current_user, get_user, health_check, login, refresh};
use crate::store::CredentialStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn CredentialStore>,
    application: ApplicationSettings,
    jwt_config: JwtSettings,
    clock: Arc<dyn Clock>,
) -> Result<Server, std::io::Error> {
    let codec = Arc::new(TokenCodec::new(&jwt_config, clock));

    let codec_data = web::Data::from(codec.clone());
    let store_data: web::Data<dyn CredentialStore> = web::Data::from(store.clone());
    let issuer = web::Data::new(SessionIssuer::new(
        store.clone(),
        codec.clone(),
        application.password_hash_cost,
    ));
    let refresher = web::Data::new(RefreshHandler::new(
        codec.clone(),
        store,
        jwt_config.refresh_grace_period,
    ));
    let cookie_settings = web::Data::new(jwt_config.cookie.clone());

    let cors_origin = application.cors_allowed_origin.clone();
    if let Some(origin) = &cors_origin {
        if Cors::new(origin).is_none() {
            tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
        }
    }

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(
                InterceptorChain::new()
                    .with_optional(cors_origin.as_deref().and_then(Cors::new)),
            )
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(codec_data.clone())
            .app_data(store_data.clone())
            .app_data(issuer.clone())
            .app_data(refresher.clone())
            .app_data(cookie_settings.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/v1")
                    .route("/auth", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/refresh-token", web::post().to(refresh))
                    // Protected routes
                    .service(
                        web::scope("/users")
                            .wrap(InterceptorChain::new().with(BearerGuard::new(codec.clone())))
                            .route("/me", web::get().to(current_user))
                            .route("/{id}", web::get().to(get_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
