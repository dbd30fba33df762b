/// Asset lookup seam.
///
/// The stage only ever asks for things by name and stores the returned
/// ids. Decoding images, fonts and textures belongs to whoever implements
/// [`AssetSource`]; [`AssetTable`] is the in-memory implementation used by
/// the terminal front-end and the tests.
use std::collections::HashMap;
use std::path::Path;

use crate::error::StageError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FontId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

impl SpriteId {
    /// Index 0 is always the stand-in sprite.
    pub const STUB: SpriteId = SpriteId(0);
}

/// Frame layout and animation metadata for one sprite.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub xorigin: i32,
    pub yorigin: i32,
    pub frame_count: i32,
    /// Frames advanced per tick.
    pub anim_spd: f32,
    /// Frame the animation wraps back to.
    pub loop_frame: i32,
}

impl Sprite {
    pub fn new(name: &str, width: i32, height: i32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            xorigin: width / 2,
            yorigin: height / 2,
            frame_count: 1,
            anim_spd: 0.0,
            loop_frame: 0,
        }
    }

    pub fn animated(mut self, frame_count: i32, anim_spd: f32, loop_frame: i32) -> Self {
        self.frame_count = frame_count.max(1);
        self.anim_spd = anim_spd;
        self.loop_frame = loop_frame.clamp(0, self.frame_count - 1);
        self
    }

    fn stub() -> Self {
        Sprite::new("", 16, 16)
    }
}

/// A named script source, loaded once at stage start.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptSource {
    pub name: String,
    pub source: String,
}

pub trait AssetSource {
    /// Always yields a usable id; unknown names resolve to the stub.
    fn find_sprite(&self, name: &str) -> SpriteId;

    fn sprite(&self, id: SpriteId) -> &Sprite;

    fn find_font(&self, name: &str) -> FontId;

    fn find_texture(&self, name: &str) -> TextureId;

    fn scripts(&self) -> &[ScriptSource];
}

#[derive(Debug)]
pub struct AssetTable {
    sprites: Vec<Sprite>,
    sprite_names: HashMap<String, SpriteId>,
    fonts: HashMap<String, FontId>,
    textures: HashMap<String, TextureId>,
    scripts: Vec<ScriptSource>,
}

impl Default for AssetTable {
    fn default() -> Self {
        Self {
            sprites: vec![Sprite::stub()],
            sprite_names: HashMap::new(),
            fonts: HashMap::new(),
            textures: HashMap::new(),
            scripts: Vec::new(),
        }
    }
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sprite(&mut self, sprite: Sprite) -> SpriteId {
        let id = SpriteId(self.sprites.len() as u32);
        self.sprite_names.insert(sprite.name.clone(), id);
        self.sprites.push(sprite);
        id
    }

    pub fn add_font(&mut self, name: &str) -> FontId {
        let id = FontId(self.fonts.len() as u32 + 1);
        *self.fonts.entry(name.to_string()).or_insert(id)
    }

    pub fn add_texture(&mut self, name: &str) -> TextureId {
        let id = TextureId(self.textures.len() as u32 + 1);
        *self.textures.entry(name.to_string()).or_insert(id)
    }

    /// Later sources with an already-known name are ignored.
    pub fn add_script(&mut self, name: &str, source: &str) {
        if self.scripts.iter().any(|s| s.name == name) {
            tracing::warn!(name, "duplicate script ignored");
            return;
        }
        self.scripts.push(ScriptSource {
            name: name.to_string(),
            source: source.to_string(),
        });
    }

    /// Register every `*.lua` file in `dir`, named by file stem.
    pub fn load_script_dir(&mut self, dir: &Path) -> Result<usize, StageError> {
        let io_err = |source| StageError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "lua"))
            .collect();
        paths.sort();

        let before = self.scripts.len();
        for path in paths {
            let source = std::fs::read_to_string(&path).map_err(|source| StageError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.add_script(&name, &source);
        }
        Ok(self.scripts.len() - before)
    }
}

impl AssetSource for AssetTable {
    fn find_sprite(&self, name: &str) -> SpriteId {
        match self.sprite_names.get(name) {
            Some(&id) => id,
            None => {
                tracing::debug!(name, "sprite not found, using stub");
                SpriteId::STUB
            }
        }
    }

    fn sprite(&self, id: SpriteId) -> &Sprite {
        self.sprites
            .get(id.0 as usize)
            .unwrap_or(&self.sprites[SpriteId::STUB.0 as usize])
    }

    fn find_font(&self, name: &str) -> FontId {
        self.fonts.get(name).copied().unwrap_or_default()
    }

    fn find_texture(&self, name: &str) -> TextureId {
        self.textures.get(name).copied().unwrap_or_default()
    }

    fn scripts(&self) -> &[ScriptSource] {
        &self.scripts
    }
}
