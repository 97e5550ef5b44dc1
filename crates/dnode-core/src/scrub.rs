//! Callback substitution for outbound and inbound argument trees.
//!
//! Outbound, [`scrub`] walks a [`Value`] tree depth-first (array elements in
//! order, object keys in sorted order), registers each function it meets and
//! writes the placeholder in its place, recording the function's path.
//!
//! Inbound, [`unscrub`] converts the decoded JSON back into a [`Value`] tree
//! and puts a callback at every path named in the message's callback map.

use crate::config::ProtocolConfig;
use crate::error::{DnodeError, Result};
use crate::function::Callback;
use crate::message::CallbackMap;
use crate::path::Path;
use crate::registry::CallbackRegistry;
use crate::value::Value;

/// Replace every function in `value` with the placeholder, registering each
/// one. Returns the wire tree and the path of every function.
pub(crate) fn scrub(value: &Value, registry: &CallbackRegistry) -> (serde_json::Value, CallbackMap) {
    let mut callbacks = CallbackMap::new();
    let mut path = Path::root();
    let tree = walk(value, &mut path, registry, &mut callbacks);
    (tree, callbacks)
}

fn walk(
    value: &Value,
    path: &mut Path,
    registry: &CallbackRegistry,
    callbacks: &mut CallbackMap,
) -> serde_json::Value {
    match value {
        Value::Function(cb) => {
            let id = registry.register(cb.clone());
            callbacks.insert(path.clone(), id);
            serde_json::Value::String(ProtocolConfig::FUNCTION_PLACEHOLDER.to_string())
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push_index(i);
                out.push(walk(item, path, registry, callbacks));
                path.pop();
            }
            serde_json::Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, item) in map {
                path.push_key(key.as_str());
                out.insert(key.clone(), walk(item, path, registry, callbacks));
                path.pop();
            }
            serde_json::Value::Object(out)
        }
        leaf => leaf.to_json(),
    }
}

/// Rebuild a [`Value`] tree from wire JSON, placing `stub(id)` at every path
/// in `callbacks`. A path that does not address an existing value is an
/// error.
pub(crate) fn unscrub(
    json: serde_json::Value,
    callbacks: &CallbackMap,
    mut stub: impl FnMut(u64) -> Callback,
) -> Result<Value> {
    let mut root = Value::from(json);

    for (path, id) in callbacks.iter() {
        let slot = locate(&mut root, path).ok_or_else(|| DnodeError::InvalidCallbackPath {
            path: path.to_string(),
            reason: format!("no value at path for callback {}", id),
        })?;
        *slot = Value::Function(stub(*id));
    }

    Ok(root)
}

fn locate<'a>(root: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = root;
    for key in path.keys() {
        current = match current {
            Value::Array(items) => items.get_mut(key.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get_mut(key.as_str())?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn noop() -> Callback {
        Callback::from_fn(|_| async { Ok(()) })
    }

    #[test]
    fn test_scrub_without_functions() {
        let registry = CallbackRegistry::new();
        let value = Value::from(json!(["a", {"b": [1, 2]}]));
        let (tree, callbacks) = scrub(&value, &registry);

        assert_eq!(tree, json!(["a", {"b": [1, 2]}]));
        assert!(callbacks.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scrub_records_nested_paths() {
        let registry = CallbackRegistry::new();
        let top = noop();
        let nested = noop();

        let mut opts = BTreeMap::new();
        opts.insert("onData".to_string(), Value::from(nested.clone()));
        opts.insert("limit".to_string(), Value::from(5u64));

        let value = Value::Array(vec![
            Value::from(top.clone()),
            Value::Object(opts),
            Value::Array(vec![Value::Null, Value::from(noop())]),
        ]);
        let (tree, callbacks) = scrub(&value, &registry);

        assert_eq!(
            tree,
            json!(["[Function]", {"limit": 5, "onData": "[Function]"}, [null, "[Function]"]])
        );
        assert_eq!(callbacks.get(&Path::parse("0")), Some(0));
        assert_eq!(callbacks.get(&Path::parse("1.onData")), Some(1));
        assert_eq!(callbacks.get(&Path::parse("2.1")), Some(2));

        assert!(registry.get(0).unwrap().ptr_eq(&top));
        assert!(registry.get(1).unwrap().ptr_eq(&nested));
    }

    #[test]
    fn test_scrub_key_order_is_sorted() {
        let registry = CallbackRegistry::new();
        let mut map = BTreeMap::new();
        map.insert("zeta".to_string(), Value::from(noop()));
        map.insert("alpha".to_string(), Value::from(noop()));

        let (_, callbacks) = scrub(&Value::Object(map), &registry);
        assert_eq!(callbacks.get(&Path::parse("alpha")), Some(0));
        assert_eq!(callbacks.get(&Path::parse("zeta")), Some(1));
    }

    #[test]
    fn test_unscrub_places_stubs() {
        let callbacks: CallbackMap = [
            (Path::parse("0"), 7),
            (Path::parse("1.cb"), 9),
        ]
        .into_iter()
        .collect();

        let mut made = Vec::new();
        let value = unscrub(json!(["[Function]", {"cb": "[Function]", "x": 1}]), &callbacks, |id| {
            made.push(id);
            noop()
        })
        .unwrap();

        assert_eq!(made, vec![7, 9]);
        let items = value.as_array().unwrap();
        assert!(items[0].is_function());
        assert!(items[1].get("cb").unwrap().is_function());
        assert_eq!(items[1].get("x").unwrap().as_u64(), Some(1));
    }

    #[test]
    fn test_unscrub_root_path() {
        let callbacks: CallbackMap = [(Path::root(), 1)].into_iter().collect();
        let value = unscrub(json!("[Function]"), &callbacks, |_| noop()).unwrap();
        assert!(value.is_function());
    }

    #[test]
    fn test_unscrub_rejects_missing_location() {
        for path in ["3", "0.missing", "x", "0.0.0"] {
            let callbacks: CallbackMap = [(Path::parse(path), 1)].into_iter().collect();
            let err = unscrub(json!([{"a": 1}]), &callbacks, |_| noop()).unwrap_err();
            assert!(
                matches!(err, DnodeError::InvalidCallbackPath { .. }),
                "path {:?} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_scrub_then_unscrub_restores_positions() {
        let registry = CallbackRegistry::new();
        let value = Value::from(json!([{"a": [0, 0]}, "s"]));
        let value = match value {
            Value::Array(mut items) => {
                if let Value::Object(map) = &mut items[0] {
                    map.insert("f".to_string(), Value::from(noop()));
                }
                items.push(Value::from(noop()));
                Value::Array(items)
            }
            other => other,
        };

        let (tree, callbacks) = scrub(&value, &registry);
        let restored = unscrub(tree, &callbacks, |_| noop()).unwrap();

        assert!(restored.as_array().unwrap()[0].get("f").unwrap().is_function());
        assert!(restored.as_array().unwrap()[2].is_function());
        assert_eq!(restored.as_array().unwrap()[1].as_str(), Some("s"));
    }
}
