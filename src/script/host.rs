//! Host functions exposed to stage scripts.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use mlua::{Function, IntoLuaMulti, Lua, MultiValue};

use super::args::{display_value, HostArgs};
use super::{ScriptSlot, CORO_DELTA};
use crate::entities::{BulletShape, DropTable, Object};
use crate::handle::{InstanceId, ObjectKind};
use crate::math;
use crate::world::{Spawn, World};

type Shared = Rc<RefCell<World>>;

fn write(world: &RefCell<World>) -> mlua::Result<RefMut<'_, World>> {
    world
        .try_borrow_mut()
        .map_err(|_| mlua::Error::RuntimeError("stage state is busy".to_string()))
}

fn read(world: &RefCell<World>) -> mlua::Result<Ref<'_, World>> {
    world
        .try_borrow()
        .map_err(|_| mlua::Error::RuntimeError("stage state is busy".to_string()))
}

pub(super) fn coroutine_slot(lua: &Lua, function: Function) -> mlua::Result<ScriptSlot> {
    let thread = lua.create_thread(function)?;
    Ok(ScriptSlot::new(lua.create_registry_value(thread)?))
}

fn callback_slot(lua: &Lua, function: Function) -> mlua::Result<ScriptSlot> {
    Ok(ScriptSlot::new(lua.create_registry_value(function)?))
}

fn optional_coroutine(lua: &Lua, function: Option<Function>) -> mlua::Result<ScriptSlot> {
    function.map_or_else(|| Ok(ScriptSlot::default()), |f| coroutine_slot(lua, f))
}

fn optional_callback(lua: &Lua, function: Option<Function>) -> mlua::Result<ScriptSlot> {
    function.map_or_else(|| Ok(ScriptSlot::default()), |f| callback_slot(lua, f))
}

fn object_getter<R>(
    lua: &Lua,
    world: &Shared,
    name: &'static str,
    get: fn(&Object) -> R,
) -> mlua::Result<Function>
where
    R: IntoLuaMulti + Default + 'static,
{
    let world = world.clone();
    lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check(name, args, 1, 1)?;
        let id = args.handle(1)?;
        let world = read(&world)?;
        Ok(world.store.find_object(id).map(get).unwrap_or_default())
    })
}

fn object_setter<T: 'static>(
    lua: &Lua,
    world: &Shared,
    name: &'static str,
    parse: fn(&HostArgs) -> mlua::Result<T>,
    set: fn(&mut Object, T),
) -> mlua::Result<Function> {
    let world = world.clone();
    lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check(name, args, 2, 2)?;
        let id = args.handle(1)?;
        let value = parse(&args)?;
        if let Some(object) = write(&world)?.store.find_object_mut(id) {
            set(object, value);
        }
        Ok(())
    })
}

fn number_arg(args: &HostArgs) -> mlua::Result<f32> {
    args.number(2)
}

pub(super) fn register(lua: &Lua, world: Shared, subtick: Rc<Cell<f32>>) -> mlua::Result<()> {
    let globals = lua.globals();

    let w = world.clone();
    let random = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("random", args, 0, 2)?;
        let (a, b) = match args.len() {
            0 => (0.0, 1.0),
            1 => (0.0, args.number(1)?),
            _ => (args.number(1)?, args.number(2)?),
        };
        Ok(write(&w)?.rng.range(a, b))
    })?;
    globals.set("random", random)?;

    let accumulator = subtick;
    let subtick = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("_subwait", args, 1, 1)?;
        let mut value = accumulator.get() + args.number(1)?;
        let tick = value >= CORO_DELTA;
        if tick {
            value -= CORO_DELTA;
        }
        accumulator.set(value);
        Ok(tick)
    })?;
    globals.set("_subtick", subtick)?;

    let log = lua.create_function(|_, args: MultiValue| {
        let line = args.iter().map(display_value).collect::<Vec<_>>().join(" ");
        tracing::info!(target: "script", "{line}");
        Ok(())
    })?;
    globals.set("log", log)?;

    let w = world.clone();
    let find_sprite = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("FindSprite", args, 1, 1)?;
        let name = args.string(1)?;
        Ok(read(&w)?.assets.find_sprite(&name).0 as i64)
    })?;
    globals.set("FindSprite", find_sprite)?;

    let w = world.clone();
    let get_time = lua.create_function(move |_, args: MultiValue| {
        HostArgs::check("GetTime", args, 0, 0)?;
        Ok(read(&w)?.time)
    })?;
    globals.set("GetTime", get_time)?;

    let get_target = lua.create_function(|_, args: MultiValue| {
        HostArgs::check("GetTarget", args, 1, 1)?;
        Ok(InstanceId::player(0).to_script())
    })?;
    globals.set("GetTarget", get_target)?;

    let w = world.clone();
    let is_alive = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("IsAlive", args, 1, 1)?;
        let id = args.handle(1)?;
        Ok(read(&w)?.is_alive(id))
    })?;
    globals.set("IsAlive", is_alive)?;

    register_spawners(lua, &world)?;
    register_bindings(lua, &world)?;
    register_accessors(lua, &world)?;
    Ok(())
}

fn register_spawners(lua: &Lua, world: &Shared) -> mlua::Result<()> {
    let globals = lua.globals();

    let w = world.clone();
    let create_boss = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("CreateBoss", args, 1, 1)?;
        let index = usize::try_from(args.integer(1)?).unwrap_or(usize::MAX);
        Ok(write(&w)?.create_boss(index).to_script())
    })?;
    globals.set("CreateBoss", create_boss)?;

    // CreateBullet(x, y, spd, dir, acc, radius, sprite, flags[, script])
    let w = world.clone();
    let create_bullet = lua.create_function(move |lua, args: MultiValue| {
        let args = HostArgs::check("CreateBullet", args, 8, 9)?;
        let spawn = Spawn {
            x: args.number(1)?,
            y: args.number(2)?,
            spd: args.number(3)?,
            dir: args.number(4)?,
            acc: args.number(5)?,
            radius: args.number(6)?,
            sprite: args.sprite(7),
            flags: args.integer(8)? as u32,
        };
        let coroutine = optional_coroutine(lua, args.function(9))?;

        let mut world = write(&w)?;
        let id = world.spawn_bullet(spawn, BulletShape::Bullet);
        bind_coroutine(&mut world, id, coroutine);
        Ok(id.to_script())
    })?;
    globals.set("CreateBullet", create_bullet)?;

    // CreateRect(x, y, spd, dir, acc, width, height, sprite, flags[, script])
    let w = world.clone();
    let create_rect = lua.create_function(move |lua, args: MultiValue| {
        let args = HostArgs::check("CreateRect", args, 9, 10)?;
        let spawn = Spawn {
            x: args.number(1)?,
            y: args.number(2)?,
            spd: args.number(3)?,
            dir: args.number(4)?,
            acc: args.number(5)?,
            radius: 0.0,
            sprite: args.sprite(8),
            flags: args.integer(9)? as u32,
        };
        let shape = BulletShape::Rect {
            width: args.number(6)?,
            height: args.number(7)?,
        };
        let coroutine = optional_coroutine(lua, args.function(10))?;

        let mut world = write(&w)?;
        let id = world.spawn_bullet(spawn, shape);
        bind_coroutine(&mut world, id, coroutine);
        Ok(id.to_script())
    })?;
    globals.set("CreateRect", create_rect)?;

    for (name, soft) in [("CreateLazer", false), ("CreateSLazer", true)] {
        // (x, y, spd, dir, sprite, length, thickness, flags[, script])
        let w = world.clone();
        let create_laser = lua.create_function(move |lua, args: MultiValue| {
            let args = HostArgs::check(name, args, 8, 9)?;
            let spawn = Spawn {
                x: args.number(1)?,
                y: args.number(2)?,
                spd: args.number(3)?,
                dir: args.number(4)?,
                acc: 0.0,
                radius: 0.0,
                sprite: args.sprite(5),
                flags: args.integer(8)? as u32,
            };
            let length = args.number(6)?;
            let thickness = args.number(7)?;
            let coroutine = optional_coroutine(lua, args.function(9))?;

            let mut world = write(&w)?;
            let id = world.spawn_laser(spawn, length, thickness, soft);
            bind_coroutine(&mut world, id, coroutine);
            Ok(id.to_script())
        })?;
        globals.set(name, create_laser)?;
    }

    // CreateEnemy(x, y, spd, dir, acc, radius, sprite, hp, drops[, script[, update[, death]]])
    let w = world.clone();
    let create_enemy = lua.create_function(move |lua, args: MultiValue| {
        let args = HostArgs::check("CreateEnemy", args, 9, 12)?;
        let spawn = Spawn {
            x: args.number(1)?,
            y: args.number(2)?,
            spd: args.number(3)?,
            dir: args.number(4)?,
            acc: args.number(5)?,
            radius: args.number(6)?,
            sprite: args.sprite(7),
            flags: 0,
        };
        let hp = args.number(8)?;
        let drops = DropTable::from_index(args.integer(9)?);
        let coroutine = optional_coroutine(lua, args.function(10))?;
        let update = optional_callback(lua, args.function(11))?;
        let death = optional_callback(lua, args.function(12))?;

        let mut world = write(&w)?;
        let id = world.spawn_enemy(spawn, hp, drops);
        if let Some(i) = world.store.enemy_index(id) {
            let enemy = &mut world.store.enemies[i];
            enemy.coroutine = coroutine;
            enemy.update_callback = update;
            enemy.death_callback = death;
        }
        Ok(id.to_script())
    })?;
    globals.set("CreateEnemy", create_enemy)?;

    Ok(())
}

fn bind_coroutine(world: &mut World, id: InstanceId, coroutine: ScriptSlot) {
    if let Some(slot) = world.store.coroutine_slot_mut(id) {
        *slot = coroutine;
    }
}

fn register_bindings(lua: &Lua, world: &Shared) -> mlua::Result<()> {
    let globals = lua.globals();

    // SetUpdate(id, fn | nil): per-frame callback of an enemy or bullet.
    let w = world.clone();
    let set_update = lua.create_function(move |lua, args: MultiValue| {
        let args = HostArgs::check("SetUpdate", args, 2, 2)?;
        let id = args.handle(1)?;
        let callback = optional_callback(lua, args.function(2))?;
        if let Some(slot) = write(&w)?.store.update_slot_mut(id) {
            *slot = callback;
        }
        Ok(())
    })?;
    globals.set("SetUpdate", set_update)?;

    // SetDeath(id, fn | nil): enemy death callback.
    let w = world.clone();
    let set_death = lua.create_function(move |lua, args: MultiValue| {
        let args = HostArgs::check("SetDeath", args, 2, 2)?;
        let id = args.handle(1)?;
        let callback = optional_callback(lua, args.function(2))?;
        if id.kind() == Some(ObjectKind::Enemy) {
            if let Some(slot) = write(&w)?.store.death_slot_mut(id) {
                *slot = callback;
            }
        }
        Ok(())
    })?;
    globals.set("SetDeath", set_death)?;

    // Kill(id): flag for removal at the end of the frame.
    let w = world.clone();
    let kill = lua.create_function(move |_, args: MultiValue| {
        let args = HostArgs::check("Kill", args, 1, 1)?;
        let id = args.handle(1)?;
        if let Some(object) = write(&w)?.store.find_object_mut(id) {
            object.mark_dead();
        }
        Ok(())
    })?;
    globals.set("Kill", kill)?;

    Ok(())
}

fn register_accessors(lua: &Lua, world: &Shared) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.set("GetX", object_getter(lua, world, "GetX", |o| o.x)?)?;
    globals.set("GetY", object_getter(lua, world, "GetY", |o| o.y)?)?;
    globals.set("GetSpd", object_getter(lua, world, "GetSpd", |o| o.spd)?)?;
    globals.set("GetDir", object_getter(lua, world, "GetDir", |o| o.dir)?)?;
    globals.set("GetAcc", object_getter(lua, world, "GetAcc", |o| o.acc)?)?;
    globals.set("GetSpr", object_getter(lua, world, "GetSpr", |o| o.sprite.0 as i64)?)?;
    globals.set("GetImg", object_getter(lua, world, "GetImg", |o| o.frame_index)?)?;

    globals.set("SetX", object_setter(lua, world, "SetX", number_arg, |o, v| o.x = v)?)?;
    globals.set("SetY", object_setter(lua, world, "SetY", number_arg, |o, v| o.y = v)?)?;
    globals.set(
        "SetSpd",
        object_setter(lua, world, "SetSpd", number_arg, |o, v| o.spd = v.max(0.0))?,
    )?;
    globals.set(
        "SetDir",
        object_setter(lua, world, "SetDir", number_arg, |o, v| o.dir = math::angle_wrap(v))?,
    )?;
    globals.set("SetAcc", object_setter(lua, world, "SetAcc", number_arg, |o, v| o.acc = v)?)?;
    globals.set(
        "SetSpr",
        object_setter(lua, world, "SetSpr", |a| Ok(a.sprite(2)), |o, v| o.sprite = v)?,
    )?;
    globals.set(
        "SetImg",
        object_setter(lua, world, "SetImg", number_arg, |o, v| o.frame_index = v)?,
    )?;

    Ok(())
}
