pub mod auth;

pub use auth::{
    ErrorBody, LoginRequest, LoginResponse, SignupRequest, SignupResponse, TokenClaims,
    UserProfile, VerifyTokenRequest, VerifyTokenResponse,
};

/// Endpoint paths of the auth service, relative to its base URL
pub mod routes {
    pub const LOGIN: &str = "/login";
    pub const SIGNUP: &str = "/signup";
    pub const VERIFY_TOKEN: &str = "/verify-token";
    pub const HEALTH: &str = "/health";
}

/// Name of the cookie holding the bearer credential
pub const TOKEN_COOKIE: &str = "token";

/// Credential lifetime in seconds (30 days)
pub const TOKEN_LIFETIME_SECS: u64 = 30 * 24 * 60 * 60;
