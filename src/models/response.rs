use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::AppError;

/// Success half of the response envelope: `{ success: true, data, meta }`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub meta: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
pub type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::new(data)))
}

pub fn created<T: Serialize>(data: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::new(data))))
}

/// List responses report their length in `meta.count`.
pub fn list<T: Serialize>(items: Vec<T>) -> ApiResult<Vec<T>> {
    let count = items.len();
    Ok(Json(ApiResponse::new(items).with_meta("count", count)))
}

/// `?limit=` query for collection endpoints
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
}

impl ListParams {
    /// `None` (or `0`) means no limit.
    pub fn limit(&self) -> Result<Option<usize>, AppError> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<usize>()
                .map(|n| (n > 0).then_some(n))
                .map_err(|_| {
                    AppError::validation_failed(
                        "Invalid query parameters",
                        vec![super::validation::FieldError::new(
                            "limit",
                            "must be a non-negative integer",
                        )],
                    )
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": [1, 2], "meta": {} }));
    }

    #[test]
    fn test_list_sets_count() {
        let Json(body) = list(vec!["a", "b", "c"]).unwrap();
        assert_eq!(body.meta["count"], 3);
    }

    #[test]
    fn test_limit_parsing() {
        let params = |raw: Option<&str>| ListParams {
            limit: raw.map(str::to_string),
        };
        assert_eq!(params(None).limit().unwrap(), None);
        assert_eq!(params(Some("5")).limit().unwrap(), Some(5));
        assert_eq!(params(Some("0")).limit().unwrap(), None);
        assert!(params(Some("ten")).limit().is_err());
        assert!(params(Some("-1")).limit().is_err());
    }
}
