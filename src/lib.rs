#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(
    missing_docs,
    clippy::missing_docs_in_private_items,
    clippy::as_conversions,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::cognitive_complexity,
    clippy::unwrap_used,
    clippy::branches_sharing_code,
    clippy::fallible_impl_from,
    clippy::filetype_is_file,
    clippy::filter_map_next,
    clippy::flat_map_option,
    clippy::fn_params_excessive_bools,
    clippy::format_push_string,
    clippy::from_iter_instead_of_collect,
    clippy::get_unwrap,
    clippy::if_then_some_else_none,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::index_refutable_slice,
    clippy::inefficient_to_string,
    clippy::items_after_statements,
    clippy::iter_not_returning_iterator,
    clippy::iter_on_empty_collections,
    clippy::iter_on_single_items,
    clippy::iter_with_drain,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::manual_assert,
    clippy::manual_clamp,
    clippy::manual_instant_elapsed,
    clippy::manual_let_else,
    clippy::manual_ok_or,
    clippy::manual_string_new,
    clippy::map_err_ignore
)]
#![doc = include_str!("../README.md")]

use std::{
    future::Future,
    net::{SocketAddr, SocketAddrV6, TcpListener},
    sync::Arc,
};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Extension, Router, Server, ServiceExt,
};

use color_eyre::Report;
use futures::FutureExt;
use settings::Config;
use token::TokenIssuer;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::info;

use crate::{
    database::{auth::Credentials, create_admin_if_no_user_exist},
    routes::{
        healthcheck::health_check,
        list_users,
        login::login,
        register::register,
        user::{get_profile, update_profile},
    },
    types::{EMail, Password},
};

mod database;
mod error_handling;
mod middlewares;
mod routes;
pub mod settings;
mod token;
pub mod trace;
mod types;

/// Run the complete application
///
/// Binds the listener, connects the pool and returns the bound
/// address together with the serving future, so tests can drive a
/// real server on an ephemeral port.
pub async fn create_app(
    config: Config,
) -> Result<(SocketAddr, impl Future<Output = Result<(), Report>> + Send), Report> {
    run_server(config).await
}

/// Start the server with the given configuration
async fn run_server(
    config: Config,
) -> Result<(SocketAddr, impl Future<Output = Result<(), Report>> + Send), Report> {
    let addr = SocketAddrV6::new("::1".parse()?, config.app.port, 0, 0);
    let listener = TcpListener::bind(addr)?;
    let addr = listener.local_addr()?;

    info!("Listening on http://{}", addr);

    let pool = database::connect(&config.database).await?;
    let token_issuer = Arc::new(TokenIssuer::new(&config.auth));

    create_admin_if_no_user_exist(
        &pool,
        &Credentials {
            email: EMail("admin@example.com".to_owned()),
            password: Password::from("password"),
        },
    )
    .await?;

    let app = Router::new()
        .route("/health_check", get(health_check))
        .route("/users", post(register))
        .route("/users", get(list_users))
        .route("/users/login", post(login))
        .route("/users/profile", get(get_profile))
        .route("/users/profile", put(update_profile));

    let svc = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(Extension(Arc::new(config)))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT])
                .allow_origin(AllowOrigin::predicate(|header, request| {
                    let Ok(origin) = header.to_str() else {
                        // We don't allow non utf-origins at the moment
                        return false;
                    };
                    let config = request
                        .extensions
                        .get::<Arc<Config>>()
                        .expect("Config is missing from extensions");

                    if config.app.allowed_origins.contains(origin) {
                        true
                    } else {
                        config.app.allow_localhost
                            && (origin.starts_with("http://localhost")
                                || origin.starts_with("https://localhost"))
                    }
                }))
                .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                .allow_credentials(true),
        )
        .layer(Extension(pool))
        .layer(Extension(token_issuer))
        .set_x_request_id(MakeRequestUuid)
        .propagate_x_request_id()
        .service(app);

    Ok((
        addr,
        Server::from_tcp(listener)?
            .serve(svc.into_make_service())
            .map(|r| r.map_err(|e| e.into())),
    ))
}
