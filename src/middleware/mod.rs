// Request middleware: soft authentication, credential throttling and
// error diagnostics

pub mod auth;
pub mod diagnostics;
pub mod throttle;
