//! Output bindings

use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{SidecarClient, SidecarError};

/// Body of an output binding invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BindingRequest {
    pub operation: String,
    pub data: Value,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl SidecarClient {
    /// Invoke `operation` on the output binding `name`, returning the raw response body
    pub async fn invoke_binding(
        &self,
        name: &str,
        operation: &str,
        data: Value,
        metadata: HashMap<String, String>,
    ) -> Result<Vec<u8>, SidecarError> {
        debug!(binding = name, operation, "invoking binding");
        let body = BindingRequest {
            operation: operation.to_string(),
            data,
            metadata,
        };

        let request = self
            .request(Method::POST, &format!("/v1.0/bindings/{name}"))
            .json(&body);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_metadata_omitted() {
        let request = BindingRequest {
            operation: "create".into(),
            data: json!("HELLO"),
            metadata: HashMap::new(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "operation": "create", "data": "HELLO" })
        );
    }
}
