//! Authentication module for Teamloom

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod sessions;

pub use cookies::{build_cookie, clear_cookie, get_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
pub use jwt::{AccessClaims, RefreshClaims, TokenService};
pub use middleware::{load_current_user, require_auth, CurrentUser};
pub use password::{hash_password, verify_password};
pub use sessions::{issue_token_pair, refresh_access_token, revoke_refresh_token, TokenPair};
