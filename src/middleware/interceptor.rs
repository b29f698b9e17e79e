/// Interceptor chain middleware
///
/// Runs an ordered list of interceptors in front of a scope. Each one either
/// lets the request continue or short-circuits with its own response. Every
/// interceptor that ran also gets to decorate the final response headers.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderMap,
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

pub trait Interceptor: 'static {
    /// `Err` stops the chain and is sent as the response.
    fn intercept(&self, req: &ServiceRequest) -> Result<(), HttpResponse>;

    fn decorate(&self, _headers: &mut HeaderMap) {}
}

#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Rc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Rc::new(interceptor));
        self
    }

    pub fn with_optional<I: Interceptor>(self, interceptor: Option<I>) -> Self {
        match interceptor {
            Some(interceptor) => self.with(interceptor),
            None => self,
        }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl<S, B> Transform<S, ServiceRequest> for InterceptorChain
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = InterceptorChainService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(InterceptorChainService {
            service: Rc::new(service),
            interceptors: Rc::new(self.interceptors.clone()),
        }))
    }
}

pub struct InterceptorChainService<S> {
    service: Rc<S>,
    interceptors: Rc<Vec<Rc<dyn Interceptor>>>,
}

impl<S, B> Service<ServiceRequest> for InterceptorChainService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let interceptors = self.interceptors.clone();

        for (position, interceptor) in interceptors.iter().enumerate() {
            if let Err(mut response) = interceptor.intercept(&req) {
                for ran in &interceptors[..=position] {
                    ran.decorate(response.headers_mut());
                }
                let res = req.into_response(response).map_into_right_body();
                return Box::pin(async move { Ok(res) });
            }
        }

        let service = self.service.clone();
        Box::pin(async move {
            let mut res = service.call(req).await?;
            for interceptor in interceptors.iter() {
                interceptor.decorate(res.headers_mut());
            }
            Ok(res.map_into_left_body())
        })
    }
}
