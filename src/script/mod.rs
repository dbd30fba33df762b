//! Lua side of the stage.
//!
//! Host functions reach the simulation through a shared
//! `Rc<RefCell<World>>`. Rust code never holds that borrow while Lua runs:
//! every resume or callback is prepared under a borrow, the borrow is
//! dropped, and only then is control handed to the script.

mod args;
mod host;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mlua::{
    Function, Lua, LuaOptions, MultiValue, RegistryKey, StdLib, Thread,
    ThreadStatus, Value,
};

use crate::assets::ScriptSource;
use crate::error::StageError;
use crate::handle::InstanceId;
use crate::world::World;

/// Ticks per coroutine round.
pub const CORO_DELTA: f32 = 1.0;

/// `wait(t)` is built on `_subwait`, which only yields once the calling
/// coroutine's own sub-tick accumulator crosses a whole tick.
const PRELUDE: &str = r#"
function _subwait(t)
    if _subtick(t) then
        coroutine.yield()
    end
end

function wait(t)
    t = t or 1
    while t > 1 do
        _subwait(1)
        t = t - 1
    end
    _subwait(t)
end
"#;

/// A registry reference owned by an entity.
///
/// Dropping the slot (or the entity that holds it) releases the reference;
/// `release` does the same early and is safe to repeat. Coroutine slots also
/// carry their sub-tick wait remainder.
#[derive(Debug, Default)]
pub struct ScriptSlot {
    key: Option<RegistryKey>,
    subtick: f32,
}

impl ScriptSlot {
    pub fn new(key: RegistryKey) -> Self {
        Self {
            key: Some(key),
            subtick: 0.0,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.key.is_some()
    }

    pub fn key(&self) -> Option<&RegistryKey> {
        self.key.as_ref()
    }

    pub fn release(&mut self) {
        self.key = None;
        self.subtick = 0.0;
    }

    pub fn subtick(&self) -> f32 {
        self.subtick
    }

    pub fn set_subtick(&mut self, subtick: f32) {
        self.subtick = subtick;
    }
}

/// Lets the boss phase machine bind `Boss{b}_Phase{p}` without knowing
/// about Lua.
pub trait CoroutineSpawner {
    fn spawn_coroutine(&self, global: &str) -> ScriptSlot;
}

/// No scripting; every phase runs without a coroutine.
impl CoroutineSpawner for () {
    fn spawn_coroutine(&self, _global: &str) -> ScriptSlot {
        ScriptSlot::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resume {
    /// Suspended at a wait; carries the coroutine's sub-tick remainder.
    Yielded(f32),
    Finished,
    Failed,
}

pub struct ScriptBridge {
    lua: Lua,
    /// Accumulator of the coroutine currently running.
    subtick: Rc<Cell<f32>>,
}

impl ScriptBridge {
    pub fn new(world: Rc<RefCell<World>>, memory_limit: Option<usize>) -> Result<Self, StageError> {
        let libs = StdLib::COROUTINE | StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8;
        let lua = Lua::new_with(libs, LuaOptions::default())?;
        if let Some(limit) = memory_limit {
            lua.set_memory_limit(limit)?;
        }

        let globals = lua.globals();
        for name in ["dofile", "load", "loadfile", "print"] {
            globals.set(name, Value::Nil)?;
        }

        let subtick = Rc::new(Cell::new(0.0));
        host::register(&lua, world, subtick.clone())?;
        lua.load(PRELUDE).set_name("prelude").exec()?;

        Ok(Self { lua, subtick })
    }

    /// Run every source once. Broken scripts are logged and skipped.
    pub fn load_scripts(&self, scripts: &[ScriptSource]) -> usize {
        let mut loaded = 0;
        for script in scripts {
            match self.lua.load(script.source.as_str()).set_name(script.name.as_str()).exec() {
                Ok(()) => loaded += 1,
                Err(e) => tracing::error!(script = %script.name, "script failed to load: {e}"),
            }
        }
        tracing::info!(loaded, total = scripts.len(), "scripts loaded");
        loaded
    }

    pub fn thread(&self, slot: &ScriptSlot) -> Option<Thread> {
        self.lua.registry_value::<Thread>(slot.key()?).ok()
    }

    pub fn function(&self, slot: &ScriptSlot) -> Option<Function> {
        self.lua.registry_value::<Function>(slot.key()?).ok()
    }

    /// Resume `thread` with the owner's handle as its only argument.
    pub fn resume(&self, thread: &Thread, id: InstanceId, subtick: f32) -> Resume {
        if thread.status() != ThreadStatus::Resumable {
            return Resume::Finished;
        }

        self.subtick.set(subtick);
        let result = thread.resume::<MultiValue>(id.to_script());
        let remainder = self.subtick.get();
        self.subtick.set(0.0);

        match result {
            Err(e) => {
                tracing::error!(%id, "coroutine error: {e}");
                Resume::Failed
            }
            Ok(_) if thread.status() == ThreadStatus::Resumable => Resume::Yielded(remainder),
            Ok(_) => Resume::Finished,
        }
    }

    /// Call a one-shot callback. Errors are logged and reported as `false`.
    pub fn call(&self, function: &Function, id: InstanceId) -> bool {
        match function.call::<MultiValue>(id.to_script()) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(%id, "callback error: {e}");
                false
            }
        }
    }

    /// Execute a console chunk and render its results with `tostring`.
    pub fn exec(&self, chunk: &str) -> Result<Vec<String>, StageError> {
        let values = self.lua.load(chunk).set_name("console").eval::<MultiValue>()?;
        Ok(values.into_iter().map(|v| args::display_value(&v)).collect())
    }

    /// Reclaim registry entries whose keys were dropped.
    pub fn expire(&self) {
        self.lua.expire_registry_values();
    }

    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }
}

impl CoroutineSpawner for ScriptBridge {
    fn spawn_coroutine(&self, global: &str) -> ScriptSlot {
        match self.lua.globals().get::<Value>(global) {
            Ok(Value::Function(function)) => match host::coroutine_slot(&self.lua, function) {
                Ok(slot) => slot,
                Err(e) => {
                    tracing::error!(global, "failed to create coroutine: {e}");
                    ScriptSlot::default()
                }
            },
            Ok(other) => {
                tracing::warn!(global, "{global} is {}, expected a function", other.type_name());
                ScriptSlot::default()
            }
            Err(e) => {
                tracing::error!(global, "failed to read global: {e}");
                ScriptSlot::default()
            }
        }
    }
}
