// src/auth.rs

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures::future::{ok, ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

/// The authenticated caller, placed in request extensions by [`Authentication`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

impl Principal {
    /// Users may only change or remove their own account.
    pub fn ensure_self(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only modify your own account".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string())),
        )
    }
}

#[derive(Deserialize)]
pub struct LoginInfo {
    /// The account email.
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

pub fn create_jwt(user_id: i64, email: &str, config: &Config) -> Result<String, AppError> {
    let expiration = Utc::now() + Duration::hours(config.jwt_ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(format!("token creation failed: {}", e)))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Principal, String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| format!("Token decode error: {}", e))?;
    let user_id = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| "Token subject is not a user id".to_string())?;
    Ok(Principal {
        user_id,
        email: token_data.claims.email,
    })
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, digest: &str) -> bool {
    verify(password, digest).unwrap_or(false)
}

/// Checks credentials and issues a token.
pub async fn authenticate(state: &AppState, info: &LoginInfo) -> Result<String, AppError> {
    let user = state.stores.users.find_by_key("email", &info.username).await?;
    match user {
        Some(user) if verify_password(&info.password, &user.password_digest) => {
            create_jwt(user.id, &user.email, &state.config)
        }
        _ => {
            warn!("Failed login for {}", info.username);
            Err(AppError::Unauthorized("Invalid credentials".to_string()))
        }
    }
}

/// POST /api/login
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginInfo>,
) -> Result<HttpResponse, AppError> {
    let token = authenticate(&data, &login_info).await?;
    info!("User {} logged in", login_info.username);
    Ok(HttpResponse::Ok().content_type("text/plain").body(token))
}

/// Validates a bearer token when one is sent. Requests without a token pass
/// through; handlers that need a caller extract [`Principal`].
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = bearer_token(&req) {
            let verified = match req.app_data::<web::Data<AppState>>() {
                Some(state) => validate_jwt(&token, &state.config.jwt_secret),
                None => Err("Authentication is not configured".to_string()),
            };
            match verified {
                Ok(principal) => {
                    debug!("Request authenticated as {}", principal.email);
                    req.extensions_mut().insert(principal);
                }
                Err(e) => {
                    let (req_parts, _payload) = req.into_parts();
                    let resp =
                        AppError::Unauthorized(format!("Invalid token: {}", e)).error_response();
                    let srv_resp = ServiceResponse::new(req_parts, resp);
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get(http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};

    async fn whoami(principal: Principal) -> HttpResponse {
        HttpResponse::Ok().body(principal.user_id.to_string())
    }

    #[test]
    fn tokens_carry_the_principal() {
        let config = Config::for_tests();
        let token = create_jwt(7, "jane@example.com", &config).unwrap();
        let principal = validate_jwt(&token, &config.jwt_secret).unwrap();
        assert_eq!(principal.user_id, 7);
        assert_eq!(principal.email, "jane@example.com");

        assert!(validate_jwt(&token, "another-secret").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut config = Config::for_tests();
        config.jwt_ttl_hours = -2;
        let token = create_jwt(7, "jane@example.com", &config).unwrap();
        assert!(validate_jwt(&token, &config.jwt_secret).is_err());
    }

    #[test]
    fn passwords_verify_against_their_digest() {
        let digest = hash_password("qwerty", 4).unwrap();
        assert_ne!(digest, "qwerty");
        assert!(verify_password("qwerty", &digest));
        assert!(!verify_password("QWERTY", &digest));
        assert!(!verify_password("qwerty", "not-a-digest"));
    }

    #[test]
    fn only_the_owner_passes_the_self_check() {
        let principal = Principal {
            user_id: 1,
            email: "a@b.co".into(),
        };
        assert!(principal.ensure_self(1).is_ok());
        assert!(matches!(principal.ensure_self(2), Err(AppError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn middleware_sets_or_rejects_the_principal() {
        let state = AppState::new(crate::store::Stores::in_memory(), Config::for_tests());
        let token = create_jwt(3, "x@y.io", &state.config).unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(Authentication)
                .route("/me", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "3");

        let anonymous = actix_test::TestRequest::get().uri("/me").to_request();
        let anonymous = actix_test::call_service(&app, anonymous).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let forged = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((http::header::AUTHORIZATION, "Bearer not.a.token"))
            .to_request();
        assert_eq!(actix_test::call_service(&app, forged).await.status(), StatusCode::UNAUTHORIZED);
    }
}
