use std::fmt;

/// The restricted key set the subject can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Left,
    Right,
    Up,
    Down,
    /// Numeral keys `1..=9`.
    Digit(u8),
    /// `x`: clears a preference ranking.
    Reset,
    /// `q`: leaves the end screen.
    Quit,
    /// Aborts the session from any wait or poll.
    Escape,
}

impl Key {
    pub const DIRECTIONS: [Key; 2] = [Key::Left, Key::Right];
    pub const VERTICAL: [Key; 3] = [Key::Up, Key::Down, Key::Space];

    pub fn digits(count: u8) -> impl Iterator<Item = Key> {
        (1..=count.min(9)).map(Key::Digit)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Space => f.write_str("space"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Digit(d) => write!(f, "{d}"),
            Key::Reset => f.write_str("x"),
            Key::Quit => f.write_str("q"),
            Key::Escape => f.write_str("escape"),
        }
    }
}
