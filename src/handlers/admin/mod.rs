// handlers/admin/mod.rs - super_admin and country_admin only
//
// Review of verification requests and per-country SMS configuration. Every
// handler derives a CountryScope from the caller before touching rows.

pub mod sms;
pub mod verification;
