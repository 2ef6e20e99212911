//! Types for representing branches and branch outcomes.

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N = 0,
    /// Taken
    T = 1
}

impl Outcome {
    pub fn from_bool(b: bool) -> Self {
        match b {
            true => Self::T,
            false => Self::N,
        }
    }

    /// Returns 'true' if this outcome is [Outcome::T].
    pub fn is_taken(&self) -> bool {
        matches!(self, Self::T)
    }

    /// The signed training value for this outcome (+1 or -1).
    pub fn sign(&self) -> i32 {
        match self {
            Self::T => 1,
            Self::N => -1,
        }
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        Self::from_bool(x)
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> bool {
        x.is_taken()
    }
}

/// Branch attributes visible to the predictor at prediction time.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchFlags(pub u32);
impl BranchFlags {
    pub const COND_FLAG: u32 = (1 << 0);
    pub const IND_FLAG: u32  = (1 << 1);

    pub const DIRECT_JUMP: Self   = Self(0);
    pub const CONDITIONAL: Self   = Self(Self::COND_FLAG);
    pub const INDIRECT: Self      = Self(Self::IND_FLAG);
    pub const COND_INDIRECT: Self = Self(Self::COND_FLAG | Self::IND_FLAG);

    pub fn new(conditional: bool, indirect: bool) -> Self {
        let mut bits = 0;
        if conditional { bits |= Self::COND_FLAG; }
        if indirect { bits |= Self::IND_FLAG; }
        Self(bits)
    }

    pub fn is_conditional(&self) -> bool { self.0 & Self::COND_FLAG != 0 }
    pub fn is_indirect(&self) -> bool { self.0 & Self::IND_FLAG != 0 }
}

/// A branch presented to a predictor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BranchInfo {
    /// The program counter value for this branch
    pub pc: usize,

    pub flags: BranchFlags,
}
impl BranchInfo {
    pub fn new(pc: usize, flags: BranchFlags) -> Self {
        Self { pc, flags }
    }

    pub fn conditional(pc: usize) -> Self {
        Self::new(pc, BranchFlags::CONDITIONAL)
    }

    pub fn indirect(pc: usize) -> Self {
        Self::new(pc, BranchFlags::INDIRECT)
    }

    /// Returns 'true' if this is a conditional instruction.
    pub fn is_conditional(&self) -> bool { self.flags.is_conditional() }

    /// Returns 'true' if this instruction indirectly specifies the target.
    pub fn is_indirect(&self) -> bool { self.flags.is_indirect() }
}

/// A record of branch execution: the branch plus its resolved behavior.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    pub info: BranchInfo,

    /// The resolved direction
    pub outcome: Outcome,

    /// The resolved target address
    pub tgt: usize,
}
impl BranchRecord {
    pub fn new(info: BranchInfo, outcome: Outcome, tgt: usize) -> Self {
        Self { info, outcome, tgt }
    }
    pub fn pc(&self) -> usize { self.info.pc }
    pub fn is_conditional(&self) -> bool { self.info.is_conditional() }
    pub fn is_indirect(&self) -> bool { self.info.is_indirect() }
}
