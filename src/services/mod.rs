// Business services: credentials, bearer tokens, throttling and persistence

pub mod credentials;
pub mod rate_limiter;
pub mod storage;
pub mod tokens;
