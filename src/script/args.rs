use mlua::{Function, MultiValue, Value};

use crate::assets::SpriteId;
use crate::handle::InstanceId;

/// Positional arguments of one host call, checked for count up front and
/// for type on access. Indices are 1-based, like Lua's.
pub(super) struct HostArgs {
    name: &'static str,
    values: Vec<Value>,
}

fn runtime(message: String) -> mlua::Error {
    mlua::Error::RuntimeError(message)
}

impl HostArgs {
    pub(super) fn check(
        name: &'static str,
        args: MultiValue,
        min: usize,
        max: usize,
    ) -> mlua::Result<Self> {
        let values: Vec<Value> = args.into_iter().collect();
        let count = values.len();
        if count < min || count > max {
            let message = if min == max {
                format!("{name}: expected {min} args got {count}")
            } else if count < min {
                format!("{name}: too few args (at least {min})")
            } else {
                format!("{name}: too many args (max {max})")
            };
            return Err(runtime(message));
        }
        Ok(Self { name, values })
    }

    pub(super) fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> &Value {
        self.values.get(index - 1).unwrap_or(&Value::Nil)
    }

    fn bad_argument(&self, index: usize, expected: &str) -> mlua::Error {
        runtime(format!(
            "bad argument #{index} to '{}' ({expected} expected, got {})",
            self.name,
            self.get(index).type_name()
        ))
    }

    pub(super) fn number(&self, index: usize) -> mlua::Result<f32> {
        match self.get(index) {
            Value::Number(n) => Ok(*n as f32),
            Value::Integer(i) => Ok(*i as f32),
            Value::String(s) => s
                .to_str()
                .ok()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|n| n as f32)
                .ok_or_else(|| self.bad_argument(index, "number")),
            _ => Err(self.bad_argument(index, "number")),
        }
    }

    pub(super) fn integer(&self, index: usize) -> mlua::Result<i64> {
        match self.get(index) {
            Value::Integer(i) => Ok(*i),
            Value::Number(n) if n.fract() == 0.0 => Ok(*n as i64),
            _ => Err(self.bad_argument(index, "integer")),
        }
    }

    pub(super) fn string(&self, index: usize) -> mlua::Result<String> {
        match self.get(index) {
            Value::String(s) => Ok(s.to_string_lossy()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.bad_argument(index, "string")),
        }
    }

    pub(super) fn handle(&self, index: usize) -> mlua::Result<InstanceId> {
        self.integer(index).map(InstanceId::from_script)
    }

    /// Sprite ids travel as integers; anything else draws as the stub.
    pub(super) fn sprite(&self, index: usize) -> SpriteId {
        match self.get(index) {
            Value::Integer(i) => u32::try_from(*i).map(SpriteId).unwrap_or(SpriteId::STUB),
            Value::Number(n) if *n >= 0.0 => SpriteId(*n as u32),
            _ => SpriteId::STUB,
        }
    }

    /// A trailing script argument. Non-functions are logged and ignored.
    pub(super) fn function(&self, index: usize) -> Option<Function> {
        match self.get(index) {
            Value::Nil => None,
            Value::Function(f) => Some(f.clone()),
            other => {
                tracing::warn!(
                    "{}: arg #{index} (script) is {}, not a function",
                    self.name,
                    other.type_name()
                );
                None
            }
        }
    }
}

/// `tostring`-style rendering for logs and the console.
pub(super) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string_lossy(),
        other => other.to_string().unwrap_or_else(|_| format!("{other:?}")),
    }
}
