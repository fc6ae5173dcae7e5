use super::GatewayEventType;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// A decoded dispatch frame
///
/// Cloning is cheap; the payload is shared between subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub name: String,
    pub sequence: Option<u64>,
    pub data: Arc<Value>,
}

impl DispatchEvent {
    pub fn new(name: impl Into<String>, sequence: Option<u64>, data: Value) -> Self {
        Self {
            name: name.into(),
            sequence,
            data: Arc::new(data),
        }
    }

    pub fn kind(&self) -> Option<GatewayEventType> {
        GatewayEventType::from_str(&self.name)
    }

    pub fn is(&self, kind: GatewayEventType) -> bool {
        self.name == kind.as_str()
    }

    /// Deserialize the payload into a caller-defined type
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.data.as_ref())
    }
}
