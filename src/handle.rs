/// Opaque instance handles.
///
/// The top 4 bits carry the [`ObjectKind`], the low 28 bits a sequence
/// number drawn from one per-stage counter. Sequence numbers are never
/// reused, so a handle to a removed object simply stops resolving. After
/// 2^28 allocations the counter is spent and new objects get
/// [`InstanceId::NULL`], which scripts cannot address.
use std::fmt;

const KIND_SHIFT: u32 = 28;
const SEQ_MASK: u32 = 0x0FFF_FFFF;

/// Highest sequence number a handle can carry.
pub const MAX_SEQUENCE: u32 = SEQ_MASK;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Player,
    Boss,
    Enemy,
    Bullet,
}

impl ObjectKind {
    fn tag(self) -> u32 {
        match self {
            ObjectKind::Player => 0,
            ObjectKind::Boss => 1,
            ObjectKind::Enemy => 2,
            ObjectKind::Bullet => 3,
        }
    }

    fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ObjectKind::Player),
            1 => Some(ObjectKind::Boss),
            2 => Some(ObjectKind::Enemy),
            3 => Some(ObjectKind::Bullet),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(u32);

impl InstanceId {
    pub const NULL: InstanceId = InstanceId(u32::MAX);

    pub fn new(kind: ObjectKind, seq: u32) -> Self {
        InstanceId((seq & SEQ_MASK) | (kind.tag() << KIND_SHIFT))
    }

    /// Players are addressed by their slot index.
    pub fn player(index: usize) -> Self {
        Self::new(ObjectKind::Player, index as u32)
    }

    pub fn kind(self) -> Option<ObjectKind> {
        ObjectKind::from_tag(self.0 >> KIND_SHIFT)
    }

    pub fn seq(self) -> u32 {
        self.0 & SEQ_MASK
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        InstanceId(raw)
    }

    /// Scripts see handles as plain integers.
    pub fn to_script(self) -> i64 {
        if self.is_null() {
            -1
        } else {
            self.0 as i64
        }
    }

    /// Anything outside the 32-bit range maps to [`InstanceId::NULL`].
    pub fn from_script(value: i64) -> Self {
        u32::try_from(value).map(InstanceId).unwrap_or(Self::NULL)
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{:?}#{}", kind, self.seq()),
            None => write!(f, "InstanceId(NULL)"),
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Hands out strictly increasing sequence numbers.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Start counting at `seq` instead of zero.
    pub fn starting_at(seq: u32) -> Self {
        Self {
            next: seq.min(MAX_SEQUENCE + 1),
        }
    }

    /// Hands out [`InstanceId::NULL`] once all `MAX_SEQUENCE + 1` sequence
    /// numbers are used up; objects created after that have no handle.
    pub fn next(&mut self, kind: ObjectKind) -> InstanceId {
        let seq = self.next;
        if seq > MAX_SEQUENCE {
            return InstanceId::NULL;
        }
        self.next += 1;
        if self.next > MAX_SEQUENCE {
            tracing::warn!("instance sequence exhausted, new objects get no handle");
        }
        InstanceId::new(kind, seq)
    }

    /// The sequence number the next allocation will use.
    pub fn peek(&self) -> u32 {
        self.next
    }
}
