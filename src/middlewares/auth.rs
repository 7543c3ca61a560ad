use crate::entities::UserRole;
use crate::error::{AppError, AppResult};
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// Caller identity decoded from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    SignedIn,
    Admin,
}

// Path prefixes that are gated; everything else is public.
struct ProtectedPaths {
    signed_in_prefixes: Vec<&'static str>,
    admin_prefixes: Vec<&'static str>,
}

impl ProtectedPaths {
    fn new() -> Self {
        Self {
            signed_in_prefixes: vec!["/api/v1/checkout"],
            admin_prefixes: vec!["/api/v1/admin"],
        }
    }

    fn required_access(&self, path: &str) -> Access {
        if self
            .admin_prefixes
            .iter()
            .any(|&prefix| path.starts_with(prefix))
        {
            return Access::Admin;
        }
        if self
            .signed_in_prefixes
            .iter()
            .any(|&prefix| path.starts_with(prefix))
        {
            return Access::SignedIn;
        }
        Access::Public
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            protected_paths: ProtectedPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    protected_paths: ProtectedPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        let required = self.protected_paths.required_access(req.path());

        let user = match bearer_token(&req).map(|t| self.jwt_service.verify_access_token(t)) {
            Some(Ok(claims)) => Some(AuthUser {
                id: claims.sub,
                role: claims.role,
            }),
            Some(Err(e)) => {
                log::debug!("Rejected access token on {}: {}", req.path(), e);
                None
            }
            None => None,
        };

        let denied = match (required, &user) {
            (Access::Public, _) => None,
            (_, None) => Some(AppError::Unauthenticated),
            (Access::Admin, Some(user)) if !user.is_admin() => Some(AppError::Forbidden),
            _ => None,
        };
        if let Some(error) = denied {
            return Box::pin(async move { Err(error.into()) });
        }

        if let Some(user) = user {
            req.extensions_mut().insert(user);
        }
        Box::pin(self.service.call(req))
    }
}

/// Signed-in caller, if the request carried a valid access token.
pub fn current_user(req: &HttpRequest) -> Option<AuthUser> {
    req.extensions().get::<AuthUser>().cloned()
}

pub fn require_user(req: &HttpRequest) -> AppResult<AuthUser> {
    current_user(req).ok_or(AppError::Unauthenticated)
}
