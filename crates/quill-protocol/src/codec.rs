use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{RpcRequest, RpcResponse};

/// JSON encoding of RPC bodies and their parameters.
pub struct RpcCodec;

impl RpcCodec {
    pub fn encode_request(request: &RpcRequest) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(request).map_err(|e| ProtocolError::Marshal(e.to_string()))
    }

    pub fn decode_request(body: &[u8]) -> ProtocolResult<RpcRequest> {
        serde_json::from_slice(body).map_err(|e| ProtocolError::Unmarshal(e.to_string()))
    }

    pub fn encode_response(response: &RpcResponse) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(response).map_err(|e| ProtocolError::Marshal(e.to_string()))
    }

    pub fn decode_response(body: &[u8]) -> ProtocolResult<RpcResponse> {
        serde_json::from_slice(body).map_err(|e| ProtocolError::Unmarshal(e.to_string()))
    }

    /// Convert typed parameters (or a result) into a JSON value. Tuples become
    /// arrays, which is how multi-parameter calls travel.
    pub fn to_value<T: Serialize>(value: &T) -> ProtocolResult<Value> {
        serde_json::to_value(value).map_err(|e| ProtocolError::Marshal(e.to_string()))
    }

    pub fn from_value<T: DeserializeOwned>(value: Value) -> ProtocolResult<T> {
        serde_json::from_value(value).map_err(|e| ProtocolError::Unmarshal(e.to_string()))
    }

    /// Binary payloads travel as standard base64 strings.
    pub fn encode_bytes(data: &[u8]) -> String {
        STANDARD.encode(data)
    }

    pub fn decode_bytes(encoded: &str) -> ProtocolResult<Vec<u8>> {
        STANDARD
            .decode(encoded)
            .map_err(|e| ProtocolError::Unmarshal(format!("invalid base64: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multi_parameter_calls_are_arrays() {
        let params = RpcCodec::to_value(&("u/1.png", RpcCodec::encode_bytes(b"\x00\xffpng"))).unwrap();
        assert_eq!(params, json!(["u/1.png", "AP9wbmc="]));

        let (id, data): (String, String) = RpcCodec::from_value(params).unwrap();
        assert_eq!(id, "u/1.png");
        assert_eq!(RpcCodec::decode_bytes(&data).unwrap(), b"\x00\xffpng");
    }

    #[test]
    fn malformed_bodies_are_unmarshal_errors() {
        assert!(matches!(
            RpcCodec::decode_request(b"{not json"),
            Err(ProtocolError::Unmarshal(_))
        ));
        assert!(matches!(
            RpcCodec::decode_request(br#"{"method":"store.get"}"#),
            Err(ProtocolError::Unmarshal(_))
        ));
        assert!(matches!(RpcCodec::decode_bytes("%%%"), Err(ProtocolError::Unmarshal(_))));
    }

    #[test]
    fn typed_params_mismatch() {
        let err = RpcCodec::from_value::<u64>(json!("text")).unwrap_err();
        assert!(matches!(err, ProtocolError::Unmarshal(_)));
    }
}
