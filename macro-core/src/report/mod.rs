//! Controller input report shared by firmware and host targets.
//!
//! A [`ControllerReport`] is one complete snapshot of the emulated pad: two
//! sticks, the directional hat, and the button set. The layout mirrors the
//! Pokken-style HID input report advertised by the firmware, so
//! [`ControllerReport::to_bytes`] produces exactly what the IN endpoint sends.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

use crate::script::Action;

/// Smallest value on either stick axis (full up / full left).
pub const STICK_MIN: u8 = 0;
/// Resting value on either stick axis.
pub const STICK_CENTER: u8 = 128;
/// Largest value on either stick axis (full down / full right).
pub const STICK_MAX: u8 = 255;

/// Size of the encoded input report in bytes.
pub const REPORT_LEN: usize = 8;

/// Bitset of pressed buttons.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Buttons(u16);

impl Buttons {
    pub const NONE: Self = Self(0);
    pub const Y: Self = Self(0x0001);
    pub const B: Self = Self(0x0002);
    pub const A: Self = Self(0x0004);
    pub const X: Self = Self(0x0008);
    pub const L: Self = Self(0x0010);
    pub const R: Self = Self(0x0020);
    pub const ZL: Self = Self(0x0040);
    pub const ZR: Self = Self(0x0080);
    pub const MINUS: Self = Self(0x0100);
    pub const PLUS: Self = Self(0x0200);
    pub const LCLICK: Self = Self(0x0400);
    pub const RCLICK: Self = Self(0x0800);
    pub const HOME: Self = Self(0x1000);
    pub const CAPTURE: Self = Self(0x2000);

    /// Every named button paired with its label, in bit order.
    pub const NAMED: [(Self, &'static str); 14] = [
        (Self::Y, "Y"),
        (Self::B, "B"),
        (Self::A, "A"),
        (Self::X, "X"),
        (Self::L, "L"),
        (Self::R, "R"),
        (Self::ZL, "ZL"),
        (Self::ZR, "ZR"),
        (Self::MINUS, "MINUS"),
        (Self::PLUS, "PLUS"),
        (Self::LCLICK, "LCLICK"),
        (Self::RCLICK, "RCLICK"),
        (Self::HOME, "HOME"),
        (Self::CAPTURE, "CAPTURE"),
    ];

    /// Returns the raw wire representation.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns the union of two button sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` when every button in `other` is pressed in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` when no button is pressed.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for Buttons {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for Buttons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }

        let mut first = true;
        for (button, label) in Self::NAMED {
            if self.contains(button) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Directional pad position. The wire value of each direction is its
/// clockwise index starting at up; `Center` is the null state.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Hat {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    #[default]
    Center,
}

impl Hat {
    /// Encodes the hat position for the input report.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        match self {
            Hat::Up => 0x00,
            Hat::UpRight => 0x01,
            Hat::Right => 0x02,
            Hat::DownRight => 0x03,
            Hat::Down => 0x04,
            Hat::DownLeft => 0x05,
            Hat::Left => 0x06,
            Hat::UpLeft => 0x07,
            Hat::Center => 0x08,
        }
    }
}

/// Position of one analog stick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stick {
    pub x: u8,
    pub y: u8,
}

impl Stick {
    /// Stick at rest.
    pub const CENTERED: Self = Self {
        x: STICK_CENTER,
        y: STICK_CENTER,
    };

    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn is_centered(self) -> bool {
        self.x == STICK_CENTER && self.y == STICK_CENTER
    }
}

impl Default for Stick {
    fn default() -> Self {
        Self::CENTERED
    }
}

/// One complete controller-input snapshot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControllerReport {
    pub buttons: Buttons,
    pub hat: Hat,
    pub left: Stick,
    pub right: Stick,
}

impl ControllerReport {
    /// Both sticks centred, hat centred, no buttons pressed.
    pub const NEUTRAL: Self = Self {
        buttons: Buttons::NONE,
        hat: Hat::Center,
        left: Stick::CENTERED,
        right: Stick::CENTERED,
    };

    /// Returns the neutral baseline report.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::NEUTRAL
    }

    /// Builds the report for a scripted action on top of a fresh neutral
    /// baseline. Nothing from earlier reports can leak into the result.
    #[must_use]
    pub const fn for_action(action: Action) -> Self {
        let mut report = Self::NEUTRAL;
        match action {
            Action::Up => report.left.y = STICK_MIN,
            Action::Down => report.left.y = STICK_MAX,
            Action::Left => report.left.x = STICK_MIN,
            Action::Right => report.left.x = STICK_MAX,
            Action::A => report.buttons = Buttons::A,
            Action::B => report.buttons = Buttons::B,
            Action::L => report.buttons = Buttons::L,
            Action::R => report.buttons = Buttons::R,
            Action::Throw => {
                report.left.y = STICK_MIN;
                report.buttons = Buttons::R;
            }
            Action::Triggers => report.buttons = Buttons::L.union(Buttons::R),
            // X and Y carry no mapping; they hold the pad at rest.
            Action::X | Action::Y | Action::Idle => {}
        }
        report
    }

    /// Returns `true` when the report equals the neutral baseline.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }

    /// Encodes the report as the 8-byte HID input payload:
    /// `buttons (LE u16), hat, lx, ly, rx, ry, vendor`.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; REPORT_LEN] {
        let buttons = self.buttons.bits().to_le_bytes();
        [
            buttons[0],
            buttons[1],
            self.hat.as_raw(),
            self.left.x,
            self.left.y,
            self.right.x,
            self.right.y,
            0,
        ]
    }
}

impl Default for ControllerReport {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for ControllerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buttons={} hat={:?} L=({},{}) R=({},{})",
            self.buttons, self.hat, self.left.x, self.left.y, self.right.x, self.right.y
        )
    }
}
