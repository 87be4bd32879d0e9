/// Router Module Index
///
/// Organizes routing into access-segregated modules. Authentication is enforced per route by
/// the `AuthUser`/`AdminUser` extractors and, for the authenticated module, additionally by a
/// router-level layer.

/// Routes accessible without a token: health check and the credential exchange.
pub mod public;

/// Routes requiring a valid bearer token.
pub mod authenticated;

/// Routes restricted to users with the `admin` role.
pub mod admin;
