use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

pub fn success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, ApiResponse::success(data))
}

pub fn success_with_message<T: Serialize>(data: T, message: impl Into<String>) -> impl IntoResponse {
    (
        StatusCode::OK,
        ApiResponse::success_with_message(data, message.into()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("packet");

        assert!(response.success);
        assert_eq!(response.data, Some("packet"));
        assert!(response.message.is_none());
        assert!(response.timestamp <= Utc::now());
    }

    #[test]
    fn test_api_response_serialization() {
        let response = ApiResponse::success_with_message(50, "配送费".to_string());
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"data\":50"));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_api_response_deserialization() {
        let json_str = r#"{
            "success": true,
            "data": "R1",
            "message": null,
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;

        let response: ApiResponse<String> = serde_json::from_str(json_str).unwrap();
        assert!(response.success);
        assert_eq!(response.data, Some("R1".to_string()));
    }
}
