use std::str::FromStr;

use thiserror::Error;

/// Rules of Conway's Game of Life.
pub const B3S23: RuleSet = RuleSet::new(0b1000, 0b1100);

/// # Representation
/// Life rules are represented as
/// ```notrust
/// |------birth------|
/// 0000_0000_0000_0000_0000_0000_0000_0000
///                     |----survival-----|
/// ```
///
/// # Examples
/// ```notrust
/// b3s23:                0000_0000_0000_1000_0000_0000_0000_1100
/// b36s23:               0000_0000_0100_1000_0000_0000_0000_1100
/// ```
///
/// See: https://conwaylife.com/wiki/Rulestring
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    rule: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        B3S23
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("Neighbor counts range from 0 to 8, found '{got}'")]
    InvalidDigit { got: char },

    #[error("Expected a rule like B3/S23 or 23/3, found \"{rule}\"")]
    InvalidString { rule: String },

    #[error("Rules with births on 0 neighbors would fill empty space, which is not supported")]
    BirthOnZero,
}

impl RuleSet {
    /// Create a new `RuleSet` for the given births and survivals. For both `b` and `s`, bit `i`
    /// being on means `i` neighbors are in the set. Any bit past the 8th is ignored.
    ///
    /// Births on 0 neighbors are not supported, see [`RuleSet::try_new`] for a checked version.
    pub const fn new(b: u16, s: u16) -> Self {
        debug_assert!(b & 1 == 0, "births on 0 neighbors are not supported");

        let b = b & 0x1FF;
        let s = s & 0x1FF;

        Self {
            rule: (b as u32) << 16 | s as u32,
        }
    }

    pub fn try_new(b: u16, s: u16) -> Result<Self, RuleError> {
        if b & 1 != 0 {
            return Err(RuleError::BirthOnZero);
        }

        Ok(Self::new(b, s))
    }

    pub fn births(&self) -> u16 {
        ((self.rule & 0x1FF0000) >> 0x10) as u16
    }

    pub fn survivals(&self) -> u16 {
        (self.rule & 0x1FF) as u16
    }

    /// State of a cell in the next generation, given its state and its number of live
    /// neighbors.
    pub fn next_state(&self, alive: bool, neighbors: u8) -> bool {
        let mask = if alive {
            self.survivals()
        } else {
            self.births()
        };

        neighbors <= 8 && mask & (1 << neighbors) != 0
    }

    /// Any region with fewer live cells than this is dead one generation later.
    ///
    /// With `p` live cells, no live cell has more than `p - 1` live neighbors and no dead cell
    /// more than `p`, so nothing survives below the lowest survival count plus one and nothing is
    /// born below the lowest birth count.
    pub fn vanishing_threshold(&self) -> u64 {
        let birth = self.births().trailing_zeros() as u64;
        let survival = self.survivals().trailing_zeros() as u64 + 1;

        birth.min(survival)
    }
}

/// Convert human readable neighbor counts to a packed bit representation
fn digits_to_mask(digits: &str) -> Result<u16, RuleError> {
    let mut n = 0;

    for c in digits.chars() {
        match c.to_digit(10) {
            Some(d) if d <= 8 => n |= 1 << d,
            _ => return Err(RuleError::InvalidDigit { got: c }),
        }
    }

    Ok(n)
}

impl FromStr for RuleSet {
    type Err = RuleError;

    /// Parses `B3/S23`, `b3s23` and the nameless survival-first form `23/3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[derive(Clone, Copy)]
        enum State {
            Start,
            Birth,
            Survival,
        }

        let s = s.trim();
        let invalid = || RuleError::InvalidString {
            rule: s.to_string(),
        };

        let (births, survivals) = if s.contains(['b', 'B', 's', 'S']) {
            let mut state = State::Start;
            let (mut b, mut sv) = (String::new(), String::new());

            for c in s.chars() {
                match (c, state) {
                    ('b' | 'B', _) => state = State::Birth,
                    ('s' | 'S', _) => state = State::Survival,
                    ('/', _) => {}
                    (_, State::Birth) => b.push(c),
                    (_, State::Survival) => sv.push(c),
                    (_, State::Start) => return Err(invalid()),
                }
            }

            (digits_to_mask(&b)?, digits_to_mask(&sv)?)
        } else {
            let Some((sv, b)) = s.split_once('/') else {
                return Err(invalid());
            };

            (digits_to_mask(b)?, digits_to_mask(sv)?)
        };

        RuleSet::try_new(births, survivals)
    }
}
