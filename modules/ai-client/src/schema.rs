use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types that can come back as OpenAI strict structured output.
///
/// Blanket-implemented for anything deriving `JsonSchema + Deserialize`.
/// OpenAI strict mode rejects schemas unless every object carries
/// `additionalProperties: false`, lists all properties as required, and
/// contains no `$ref` indirection, so the schemars output is rewritten
/// before it goes on the wire.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn strict_schema() -> Value {
        let mut schema = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = schema
            .as_object()
            .and_then(|m| m.get("definitions"))
            .cloned()
            .unwrap_or(Value::Null);
        rewrite(&mut schema, &definitions);

        if let Value::Object(map) = &mut schema {
            map.remove("definitions");
            map.remove("$schema");
        }
        schema
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// One recursive pass: inline `$ref`s, collapse single-entry `allOf`
/// wrappers, and apply strict-mode object rules.
fn rewrite(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        rewrite(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap();
                    rewrite(value, definitions);
                    return;
                }
            }

            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }

            for (_, v) in map.iter_mut() {
                rewrite(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                rewrite(item, definitions);
            }
        }
        _ => {}
    }
}
