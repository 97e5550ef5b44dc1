//! Decode-deferred argument payloads.
//!
//! A [`Partial`] keeps the `arguments` field of a message as raw JSON until
//! the consumer decides how to read it:
//!
//! - [`Partial::unmarshal`] decodes straight into a typed structure, for
//!   callers that know the expected shape.
//! - [`Partial::value`] / [`Partial::arguments`] decode into a [`Value`] tree
//!   where every position listed in the message's callback map holds a stub.
//!   Calling a stub sends a message back to the peer with the callback id as
//!   its method.

use crate::error::{DnodeError, Result};
use crate::message::CallbackMap;
use crate::peer::Peer;
use crate::scrub::unscrub;
use crate::value::{Arguments, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;

/// Raw arguments of a message plus what is needed to rebuild its callbacks.
#[derive(Clone)]
pub struct Partial {
    raw: Box<RawValue>,
    callbacks: CallbackMap,
    peer: Option<Peer>,
}

impl Default for Partial {
    fn default() -> Self {
        Self::from_raw(RawValue::NULL.to_owned())
    }
}

impl Partial {
    pub fn from_raw(raw: Box<RawValue>) -> Self {
        Self {
            raw,
            callbacks: CallbackMap::default(),
            peer: None,
        }
    }

    /// Encode any serializable value as the raw payload.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::from_raw(serde_json::value::to_raw_value(value)?))
    }

    pub fn with_callbacks(mut self, callbacks: CallbackMap) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Attach the connection that stubs will send through.
    pub(crate) fn bind(&mut self, peer: Peer) {
        self.peer = Some(peer);
    }

    /// The undecoded JSON text.
    pub fn raw(&self) -> &str {
        self.raw.get()
    }

    pub fn callbacks(&self) -> &CallbackMap {
        &self.callbacks
    }

    pub fn is_bound(&self) -> bool {
        self.peer.is_some()
    }

    /// Strict decode into `T`. Callback positions hold the placeholder
    /// string, so `T` should not expect functions there.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.raw.get())
            .map_err(|e| DnodeError::invalid_arguments(e.to_string()))
    }

    /// Generic decode with stubs placed at every callback position.
    pub fn value(&self) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(self.raw.get())?;
        if self.callbacks.is_empty() {
            return Ok(Value::from(json));
        }

        let peer = self.peer.as_ref().ok_or(DnodeError::Unbound)?;
        unscrub(json, &self.callbacks, |id| peer.stub(id))
    }

    /// Generic decode spread into a positional argument list.
    pub fn arguments(&self) -> Result<Arguments> {
        self.value().map(Arguments::from_value)
    }

    /// The only element of an argument array.
    pub fn one(&self) -> Result<Value> {
        let mut items = self.slice()?;
        if items.len() != 1 {
            return Err(DnodeError::invalid_arguments(format!(
                "expected exactly one argument, got {}",
                items.len()
            )));
        }
        Ok(items.remove(0))
    }

    /// The argument tree, which must be an array.
    pub fn slice(&self) -> Result<Vec<Value>> {
        match self.value()? {
            Value::Array(items) => Ok(items),
            _ => Err(DnodeError::invalid_arguments("arguments are not an array")),
        }
    }

    /// The argument tree, which must be an object.
    pub fn map(&self) -> Result<BTreeMap<String, Value>> {
        match self.value()? {
            Value::Object(map) => Ok(map),
            _ => Err(DnodeError::invalid_arguments("arguments are not an object")),
        }
    }

    pub fn string(&self) -> Result<String> {
        self.unmarshal()
    }

    pub fn float64(&self) -> Result<f64> {
        self.unmarshal()
    }

    pub fn bool(&self) -> Result<bool> {
        self.unmarshal()
    }
}

impl fmt::Debug for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partial")
            .field("raw", &self.raw.get())
            .field("callbacks", &self.callbacks)
            .field("bound", &self.peer.is_some())
            .finish()
    }
}

impl Serialize for Partial {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Partial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Box::<RawValue>::deserialize(deserializer).map(Partial::from_raw)
    }
}
