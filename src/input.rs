/// Per-player input bitmask, sampled once per frame before the update pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputState(pub u32);

impl InputState {
    pub const RIGHT: u32 = 1;
    pub const UP: u32 = 1 << 1;
    pub const LEFT: u32 = 1 << 2;
    pub const DOWN: u32 = 1 << 3;
    pub const FIRE: u32 = 1 << 4;
    pub const BOMB: u32 = 1 << 5;
    pub const FOCUS: u32 = 1 << 6;

    pub fn held(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn with(self, bit: u32) -> Self {
        InputState(self.0 | bit)
    }

    /// Raw (unnormalized) direction from the arrow bits.
    pub fn axis(self) -> (f32, f32) {
        let mut x = 0.0;
        let mut y = 0.0;
        if self.held(Self::LEFT) {
            x -= 1.0;
        }
        if self.held(Self::RIGHT) {
            x += 1.0;
        }
        if self.held(Self::UP) {
            y -= 1.0;
        }
        if self.held(Self::DOWN) {
            y += 1.0;
        }
        (x, y)
    }
}

/// Where the stage reads input from each frame.
pub trait InputSource {
    fn player_input(&mut self, player: usize) -> InputState;

    /// The debug console swallows gameplay keys while it has focus.
    fn console_focused(&self) -> bool {
        false
    }

    /// Debug key: end the current boss phase right away.
    fn force_end_phase(&mut self) -> bool {
        false
    }
}

/// Fixed input, handy for replays and tests.
#[derive(Clone, Debug, Default)]
pub struct FixedInput {
    pub players: [InputState; crate::entities::MAX_PLAYERS],
    pub force_end_phase: bool,
    pub console_focused: bool,
}

impl FixedInput {
    pub fn player0(state: InputState) -> Self {
        let mut input = Self::default();
        input.players[0] = state;
        input
    }
}

impl InputSource for FixedInput {
    fn player_input(&mut self, player: usize) -> InputState {
        self.players.get(player).copied().unwrap_or_default()
    }

    fn console_focused(&self) -> bool {
        self.console_focused
    }

    fn force_end_phase(&mut self) -> bool {
        std::mem::take(&mut self.force_end_phase)
    }
}
