// Action kinds and the outcome of performing one.

/// The three actions a player can choose on their turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    CastSpell,
    SpecialMove,
}

impl ActionKind {
    /// Map the number a player types (0, 1, 2) to an action.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ActionKind::Attack),
            1 => Some(ActionKind::CastSpell),
            2 => Some(ActionKind::SpecialMove),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ActionKind::Attack => 0,
            ActionKind::CastSpell => 1,
            ActionKind::SpecialMove => 2,
        }
    }
}

/// Result of one action. Consumed immediately by whoever resolves it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub description: String,
    pub damage: u32,
    pub heal: u32,
    pub is_error: bool,
    /// Set when the target's protection absorbed this action.
    pub blocked: Option<String>,
}

impl ActionOutcome {
    pub fn hit(description: String, damage: u32) -> Self {
        Self {
            description,
            damage,
            ..Self::default()
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            is_error: true,
            ..Self::default()
        }
    }
}
