// handlers/protected/mod.rs - JWT authentication required
//
// Applicant-facing verification endpoints. The acting user always comes from
// the token; admins may read another user's request within their country.

pub mod business;
pub mod driver;
pub mod verification;
