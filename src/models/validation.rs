use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::OnceLock;

use super::errors::AppError;

/// A single rule violation reported back to the client
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Payloads that check their own field rules after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// Collects field errors so a client sees every problem in one response.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Character-count bounds; `max` of `None` leaves the upper end open.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: Option<usize>) -> &mut Self {
        let count = value.chars().count();
        if count < min {
            self.errors.push(FieldError::new(
                field,
                format!("must contain at least {} character(s)", min),
            ));
        } else if let Some(max) = max {
            if count > max {
                self.errors.push(FieldError::new(
                    field,
                    format!("must contain at most {} character(s)", max),
                ));
            }
        }
        self
    }

    pub fn optional_length(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: Option<usize>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.length(field, value, min, max);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(field, email_pattern().is_match(value), "must be a valid email address")
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            let valid = url::Url::parse(value)
                .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                .unwrap_or(false);
            self.check(field, valid, "must be a valid URL");
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(field, value.is_finite() && value > 0.0, "must be greater than 0")
    }

    pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(
            field,
            value.is_finite() && value >= 0.0,
            "must be greater than or equal to 0",
        )
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turns collected errors into a 400 carrying `message`.
    pub fn finish(self, message: &str) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_failed(message, self.errors))
        }
    }
}

/// JSON body extractor that runs [`Validate`] and reports failures as
/// enveloped 400s instead of axum's plain-text rejections.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// `Query` with its rejection reported through the error envelope.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Path` with its rejection reported through the error envelope.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds() {
        let mut v = Validator::new();
        v.length("username", "ab", 3, Some(50))
            .length("title", &"x".repeat(151), 3, Some(150))
            .length("ok", "fine", 3, None);

        let err = v.finish("Invalid data").unwrap_err();
        match err {
            AppError::ValidationError { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["username", "title"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut v = Validator::new();
        v.length("name", "कला", 3, Some(3));
        assert!(v.is_empty());
    }

    #[test]
    fn test_email_rules() {
        let mut v = Validator::new();
        v.email("email", "alice@x.com");
        assert!(v.is_empty());

        for bad in ["alice", "alice@", "@x.com", "a b@x.com", "alice@x"] {
            let mut v = Validator::new();
            v.email("email", bad);
            assert!(!v.is_empty(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_url_rules() {
        let mut v = Validator::new();
        v.url("imageUrl", Some("https://images.example.com/pot.jpg"))
            .url("imageUrl", None);
        assert!(v.is_empty());

        let mut v = Validator::new();
        v.url("imageUrl", Some("not a url"));
        assert!(!v.is_empty());

        let mut v = Validator::new();
        v.url("imageUrl", Some("javascript:alert(1)"));
        assert!(!v.is_empty());
    }

    #[test]
    fn test_numeric_rules() {
        let mut v = Validator::new();
        v.positive("price", 0.0)
            .positive("price", f64::NAN)
            .non_negative("stock", -1.0);
        assert_eq!(v.errors.len(), 3);

        let mut v = Validator::new();
        v.positive("price", 12.5).non_negative("stock", 0.0);
        assert!(v.is_empty());
    }
}
