pub mod auth;
pub mod response;

pub use auth::{jwt_auth_middleware, require_admin_middleware, AuthUser};
pub use response::{error_detail_middleware, ApiResponse, ApiResult};
