// xats-common/src/validation/structural.rs
use serde_json::{Map, Value};

/// Collects structural problems while walking a JSON value.
#[derive(Debug, Default)]
pub(crate) struct Checker {
    pub errors: Vec<String>,
}

impl Checker {
    pub fn object<'v>(&mut self, value: &'v Value, at: &str) -> Option<&'v Map<String, Value>> {
        match value.as_object() {
            Some(obj) => Some(obj),
            None => {
                self.type_error(at, "an object", value);
                None
            }
        }
    }

    pub fn array<'v>(&mut self, value: &'v Value, at: &str) -> Option<&'v Vec<Value>> {
        match value.as_array() {
            Some(items) => Some(items),
            None => {
                self.type_error(at, "an array", value);
                None
            }
        }
    }

    /// Field that must be present; reports its absence.
    pub fn required<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        at: &str,
    ) -> Option<&'v Value> {
        let value = obj.get(key).filter(|v| !v.is_null());
        if value.is_none() {
            self.errors.push(format!("{at}.{key} is required"));
        }
        value
    }

    pub fn string(&mut self, obj: &Map<String, Value>, key: &str, at: &str, required: bool) {
        self.field(obj, key, at, required, "a string", Value::is_string);
    }

    pub fn boolean(&mut self, obj: &Map<String, Value>, key: &str, at: &str, required: bool) {
        self.field(obj, key, at, required, "a boolean", Value::is_boolean);
    }

    pub fn unsigned(&mut self, obj: &Map<String, Value>, key: &str, at: &str, required: bool) {
        self.field(obj, key, at, required, "a non-negative integer", Value::is_u64);
    }

    pub fn number(&mut self, obj: &Map<String, Value>, key: &str, at: &str, required: bool) {
        self.field(obj, key, at, required, "a number", Value::is_number);
    }

    pub fn one_of(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        at: &str,
        required: bool,
        allowed: &[&str],
    ) {
        let Some(value) = self.lookup(obj, key, at, required) else {
            return;
        };
        match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => self.errors.push(format!(
                "{at}.{key} must be one of [{}], got '{s}'",
                allowed.join(", ")
            )),
            None => self.type_error(&format!("{at}.{key}"), "a string", value),
        }
    }

    pub fn string_array(&mut self, obj: &Map<String, Value>, key: &str, at: &str, required: bool) {
        let Some(value) = self.lookup(obj, key, at, required) else {
            return;
        };
        let path = format!("{at}.{key}");
        if let Some(items) = self.array(value, &path) {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    self.type_error(&format!("{path}[{i}]"), "a string", item);
                }
            }
        }
    }

    /// Optional or required nested object.
    pub fn nested<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        at: &str,
        required: bool,
    ) -> Option<&'v Map<String, Value>> {
        let value = self.lookup(obj, key, at, required)?;
        self.object(value, &format!("{at}.{key}"))
    }

    fn lookup<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        at: &str,
        required: bool,
    ) -> Option<&'v Value> {
        if required {
            self.required(obj, key, at)
        } else {
            obj.get(key).filter(|v| !v.is_null())
        }
    }

    fn field(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        at: &str,
        required: bool,
        expected: &str,
        ok: fn(&Value) -> bool,
    ) {
        if let Some(value) = self.lookup(obj, key, at, required) {
            if !ok(value) {
                self.type_error(&format!("{at}.{key}"), expected, value);
            }
        }
    }

    fn type_error(&mut self, at: &str, expected: &str, got: &Value) {
        let kind = match got {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };
        self.errors.push(format!("{at} must be {expected}, got {kind}"));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reports_every_problem() {
        let value = json!({"name": 3, "flag": "yes", "level": "gold"});
        let mut c = Checker::default();
        let obj = c.object(&value, "$").unwrap();
        c.string(obj, "name", "$", true);
        c.boolean(obj, "flag", "$", false);
        c.one_of(obj, "level", "$", true, &["verified", "community"]);
        c.string(obj, "url", "$", true);
        assert_eq!(c.errors.len(), 4, "{:?}", c.errors);
        assert!(c.errors.contains(&"$.url is required".to_string()));
    }
}
