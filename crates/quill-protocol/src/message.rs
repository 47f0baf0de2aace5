use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call of one remote method.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Answer to an [`RpcRequest`] with the same id. A non-empty `error`
/// takes precedence over `result`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl RpcResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: String::new(),
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// The result value, or the remote error string.
    pub fn into_result(self) -> Result<Value, String> {
        if self.is_error() {
            Err(self.error)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let req = RpcRequest {
            id: 7,
            method: "store.get".into(),
            params: json!({"id": "c1"}),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"id": 7, "method": "store.get", "params": {"id": "c1"}})
        );

        assert_eq!(
            serde_json::to_value(RpcResponse::ok(7, json!(true))).unwrap(),
            json!({"id": 7, "result": true})
        );
        assert_eq!(
            serde_json::to_value(RpcResponse::err(7, "not found")).unwrap(),
            json!({"id": 7, "error": "not found"})
        );
    }

    #[test]
    fn missing_params_and_null_result() {
        let req: RpcRequest = serde_json::from_str(r#"{"id":1,"method":"store.close"}"#).unwrap();
        assert_eq!(req.params, Value::Null);

        let resp: RpcResponse = serde_json::from_str(r#"{"id":1,"result":null}"#).unwrap();
        assert_eq!(resp.into_result(), Ok(Value::Null));

        let resp: RpcResponse = serde_json::from_str(r#"{"id":1,"result":3,"error":"boom"}"#).unwrap();
        assert_eq!(resp.into_result(), Err("boom".to_string()));
    }
}
