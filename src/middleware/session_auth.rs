/// Session Authentication Middleware
///
/// Runs the authorization decision for every request in the wrapped scope.
/// Allowed requests get their `AccessDetails` in request extensions and any
/// rotated tokens appended to the response as cookies. A rotation has
/// already retired the old refresh session, so the new cookies go out even
/// when an inner service fails.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::error::ErrorResponse;
use crate::middleware::authorize::{authorize, AuthOutcome};
use crate::transport::ResponseCredentials;

/// Middleware for routes that require an authenticated session
pub struct SessionAuth {
    tokens: Arc<TokenService>,
}

impl SessionAuth {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionAuthService {
            service: Rc::new(service),
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct SessionAuthService<S> {
    service: Rc<S>,
    tokens: Arc<TokenService>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let tokens = self.tokens.clone();

        Box::pin(async move {
            let mut issued = ResponseCredentials::new();
            let outcome = authorize(&tokens, req.request(), &mut issued).await;

            match outcome {
                AuthOutcome::Allowed(details) => {
                    tracing::debug!(
                        user_id = details.user_id,
                        role = %details.role,
                        path = %req.path(),
                        "Request authorized"
                    );
                    req.extensions_mut().insert(details);
                    let http_req = req.request().clone();

                    let mut res = match service.call(req).await {
                        Ok(res) => res.map_into_left_body(),
                        Err(err) if issued.cookies().is_empty() => return Err(err),
                        Err(err) => {
                            tracing::warn!("Inner service failed after rotation; keeping new cookies");
                            ServiceResponse::new(http_req, err.error_response()).map_into_right_body()
                        }
                    };
                    append_cookies(&mut res, &issued)?;
                    Ok(res)
                }
                AuthOutcome::Denied(err) => {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    err.log(&request_id);

                    let status = err.status_code();
                    let reason = issued.reason().map(str::to_string).unwrap_or_else(|| err.reason());
                    let response = HttpResponse::build(status).json(ErrorResponse::new(
                        request_id,
                        reason,
                        err.code().to_string(),
                        status.as_u16(),
                    ));

                    Err(actix_web::error::InternalError::from_response(err, response).into())
                }
            }
        })
    }
}

fn append_cookies<B>(res: &mut ServiceResponse<B>, issued: &ResponseCredentials) -> Result<(), Error> {
    for cookie in issued.cookies() {
        res.response_mut()
            .add_cookie(cookie)
            .map_err(actix_web::error::ErrorInternalServerError)?;
    }
    Ok(())
}
