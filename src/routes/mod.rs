/// Router Module Index
///
/// Routes are split by access level so that the token guard is applied to a
/// whole router at once rather than per handler.

/// Routes accessible to anonymous callers: listing, creation, login.
pub mod public;

/// Routes behind the admin token guard.
pub mod admin;
