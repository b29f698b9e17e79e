/// Middleware module
///
/// Request interceptors composed into an ordered chain per scope.

mod bearer_guard;
mod cors;
mod interceptor;

pub use bearer_guard::BearerGuard;
pub use cors::Cors;
pub use interceptor::{Interceptor, InterceptorChain};
