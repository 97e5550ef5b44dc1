//! Wire message and callback map.
//!
//! One message is one transport unit, a JSON object:
//!
//! ```text
//! {
//!   "method":    "name" | <callback id>,
//!   "arguments": [ ... "[Function]" ... ],
//!   "callbacks": { "<path>": <callback id>, ... },
//!   "links":     []
//! }
//! ```
//!
//! `links` is reserved; it is always written empty and ignored on read.

use crate::error::Result;
use crate::partial::Partial;
use crate::path::Path;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// What a message invokes: a registered method or a previously sent callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodId {
    Callback(u64),
    Name(String),
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodId::Callback(id) => write!(f, "callback {}", id),
            MethodId::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for MethodId {
    fn from(name: &str) -> Self {
        MethodId::Name(name.to_string())
    }
}

impl From<String> for MethodId {
    fn from(name: String) -> Self {
        MethodId::Name(name)
    }
}

impl From<u64> for MethodId {
    fn from(id: u64) -> Self {
        MethodId::Callback(id)
    }
}

/// Callback positions inside a message's arguments, path to callback id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackMap(BTreeMap<Path, u64>);

impl CallbackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: Path, id: u64) {
        self.0.insert(path, id);
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.0.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &u64)> {
        self.0.iter()
    }

    /// Callback ids in path order.
    pub fn ids(&self) -> Vec<u64> {
        self.0.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Path, u64)> for CallbackMap {
    fn from_iter<I: IntoIterator<Item = (Path, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for CallbackMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(path, id)| (path.to_string(), id)))
    }
}

impl<'de> Deserialize<'de> for CallbackMap {
    /// Accepts `{"<path>": id}` as well as the upstream dnode form
    /// `{"<id>": [key, ...]}`, where keys may be strings or integers.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut map = CallbackMap::new();

        for (key, value) in raw {
            match value {
                serde_json::Value::Number(n) => {
                    let id = n.as_u64().ok_or_else(|| {
                        D::Error::custom(format!("callback id for {:?} is not an unsigned integer", key))
                    })?;
                    map.insert(Path::parse(&key), id);
                }
                serde_json::Value::Array(keys) => {
                    let id = key.parse::<u64>().map_err(|_| {
                        D::Error::custom(format!("callback id {:?} is not an unsigned integer", key))
                    })?;
                    let segments = keys
                        .into_iter()
                        .map(|k| match k {
                            serde_json::Value::String(s) => Ok(s),
                            serde_json::Value::Number(n) => Ok(n.to_string()),
                            other => Err(D::Error::custom(format!(
                                "invalid path segment {} for callback {}",
                                other, id
                            ))),
                        })
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    map.insert(Path::from_keys(segments), id);
                }
                other => {
                    return Err(D::Error::custom(format!(
                        "invalid callback entry {:?}: {}",
                        key, other
                    )));
                }
            }
        }

        Ok(map)
    }
}

/// A single protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub method: MethodId,

    #[serde(default)]
    pub arguments: Partial,

    #[serde(default)]
    pub callbacks: CallbackMap,

    #[serde(default)]
    pub links: Vec<serde_json::Value>,
}

impl Message {
    /// Build an outbound message from an already scrubbed argument tree.
    pub fn new(
        method: impl Into<MethodId>,
        arguments: &serde_json::Value,
        callbacks: CallbackMap,
    ) -> Result<Self> {
        Ok(Self {
            method: method.into(),
            arguments: Partial::from_json(arguments)?.with_callbacks(callbacks.clone()),
            callbacks,
            links: Vec::new(),
        })
    }

    /// Parse one inbound message. The callback map is attached to the
    /// arguments so that generic decoding can place stubs.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut message: Message = serde_json::from_slice(bytes)?;
        message.arguments = message.arguments.with_callbacks(message.callbacks.clone());
        Ok(message)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_id_forms() {
        let by_name: MethodId = serde_json::from_value(json!("ping")).unwrap();
        assert_eq!(by_name, MethodId::Name("ping".into()));

        let by_id: MethodId = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(by_id, MethodId::Callback(7));

        assert!(serde_json::from_value::<MethodId>(json!(-1)).is_err());
        assert_eq!(serde_json::to_value(MethodId::from(3u64)).unwrap(), json!(3));
    }

    #[test]
    fn test_decode_minimal_message() {
        let msg = Message::decode(br#"{"method":"ping","arguments":[],"callbacks":{},"links":[]}"#)
            .unwrap();

        assert_eq!(msg.method, MethodId::from("ping"));
        assert!(msg.callbacks.is_empty());
        assert!(msg.links.is_empty());
        assert_eq!(msg.arguments.raw(), "[]");
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let msg = Message::decode(br#"{"method":3}"#).unwrap();
        assert_eq!(msg.method, MethodId::Callback(3));
        assert!(msg.callbacks.is_empty());
        assert_eq!(msg.arguments.raw(), "null");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Message::decode(b"not json").is_err());
        assert!(Message::decode(br#"{"arguments":[]}"#).is_err());
    }

    #[test]
    fn test_callback_map_path_form() {
        let map: CallbackMap =
            serde_json::from_value(json!({"0": 7, "1.onData": 8})).unwrap();

        assert_eq!(map.get(&Path::from_keys(["0"])), Some(7));
        assert_eq!(map.get(&Path::from_keys(["1", "onData"])), Some(8));
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            json!({"0": 7, "1.onData": 8})
        );
    }

    #[test]
    fn test_callback_map_upstream_form() {
        let upstream: CallbackMap =
            serde_json::from_value(json!({"7": ["0"], "8": [1, "onData"]})).unwrap();
        let native: CallbackMap =
            serde_json::from_value(json!({"0": 7, "1.onData": 8})).unwrap();

        assert_eq!(upstream, native);
    }

    #[test]
    fn test_callback_map_rejects_bad_entries() {
        assert!(serde_json::from_value::<CallbackMap>(json!({"0": "x"})).is_err());
        assert!(serde_json::from_value::<CallbackMap>(json!({"0": -4})).is_err());
        assert!(serde_json::from_value::<CallbackMap>(json!({"abc": ["0"]})).is_err());
        assert!(serde_json::from_value::<CallbackMap>(json!({"1": [null]})).is_err());
    }

    #[test]
    fn test_encode_shape() {
        let callbacks: CallbackMap = [(Path::from_keys(["1"]), 0)].into_iter().collect();
        let msg = Message::new("echo", &json!(["hi", "[Function]"]), callbacks).unwrap();
        let wire: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();

        assert_eq!(
            wire,
            json!({
                "method": "echo",
                "arguments": ["hi", "[Function]"],
                "callbacks": {"1": 0},
                "links": []
            })
        );
    }
}
