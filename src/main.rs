// src/main.rs

mod app_state;
mod auth;
mod config;
mod error;
mod filter;
mod guard;
mod labels;
mod models;
mod patch;
mod seed;
mod store;
mod task_statuses;
mod tasks;
mod users;

#[cfg(test)]
mod test_support;

use std::io;

use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use crate::app_state::AppState;
use crate::auth::{login, Authentication};
use crate::config::Config;
use crate::error::AppError;
use crate::filter::TOTAL_COUNT_HEADER;
use crate::labels::{create_label, delete_label, get_label, list_labels, update_label};
use crate::store::Stores;
use crate::task_statuses::{
    create_task_status, delete_task_status, get_task_status, list_task_statuses, update_task_status,
};
use crate::tasks::{create_task, delete_task, get_task, list_tasks, update_task};
use crate::users::{create_user, delete_user, get_user, list_users, update_user};

/// Routes and extractor settings, shared by the server and the API tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| match err {
            JsonPayloadError::Deserialize(e) => AppError::validation(e.to_string()).into(),
            other => other.into(),
        }),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .wrap(Authentication)
            .route("/login", web::post().to(login))
            // USERS
            .service(
                web::scope("/users")
                    .route("", web::get().to(list_users))
                    .route("", web::post().to(create_user))
                    .route("/{id}", web::get().to(get_user))
                    .route("/{id}", web::put().to(update_user))
                    .route("/{id}", web::delete().to(delete_user)),
            )
            // TASK STATUSES
            .service(
                web::scope("/task_statuses")
                    .route("", web::get().to(list_task_statuses))
                    .route("", web::post().to(create_task_status))
                    .route("/{id}", web::get().to(get_task_status))
                    .route("/{id}", web::put().to(update_task_status))
                    .route("/{id}", web::delete().to(delete_task_status)),
            )
            // LABELS
            .service(
                web::scope("/labels")
                    .route("", web::get().to(list_labels))
                    .route("", web::post().to(create_label))
                    .route("/{id}", web::get().to(get_label))
                    .route("/{id}", web::put().to(update_label))
                    .route("/{id}", web::delete().to(delete_label)),
            )
            // TASKS
            .service(
                web::scope("/tasks")
                    .route("", web::get().to(list_tasks))
                    .route("", web::post().to(create_task))
                    .route("/{id}", web::get().to(get_task))
                    .route("/{id}", web::put().to(update_task))
                    .route("/{id}", web::delete().to(delete_task)),
            ),
    );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(io::Error::other)?;
    let stores = match &config.mongo_uri {
        Some(uri) => Stores::mongo(uri, &config.database_name)
            .await
            .map_err(io::Error::other)?,
        None => {
            warn!("MONGO_URI is not set, records are kept in memory only");
            Stores::in_memory()
        }
    };
    let state = web::Data::new(AppState::new(stores, config.clone()));
    seed::run(&state).await.map_err(io::Error::other)?;

    info!("Server running at http://{}", config.bind_address);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let frontend_origin = config.frontend_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .expose_headers(vec![TOTAL_COUNT_HEADER])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
