use serde::{Deserialize, Serialize};

/// JSON envelope every `/api` route responds with.
///
/// `{"success": true, "data": ...}` on success and
/// `{"success": false, "error": "..."}` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            total: None,
            error: None,
        }
    }

    /// Successful search result with the server-reported match count
    pub fn with_total(data: T, total: Option<u32>) -> Self {
        Self {
            total,
            ..Self::ok(data)
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            total: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape() {
        let value = serde_json::to_value(Envelope::ok(json!({"id": "p1"}))).unwrap();
        assert_eq!(value, json!({"success": true, "data": {"id": "p1"}}));
    }

    #[test]
    fn search_shape_carries_total() {
        let value = serde_json::to_value(Envelope::with_total(vec![1, 2], Some(7))).unwrap();
        assert_eq!(value, json!({"success": true, "data": [1, 2], "total": 7}));
    }

    #[test]
    fn error_shape() {
        let value = serde_json::to_value(Envelope::error("boom")).unwrap();
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}
