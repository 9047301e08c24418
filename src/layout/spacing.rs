//! Padding and margin resolution.
//!
//! A side's value is taken from the most specific key that is set:
//!
//! ```text
//! top    = pt ?? py ?? p
//! right  = pr ?? px ?? p
//! bottom = pb ?? py ?? p
//! left   = pl ?? px ?? p
//! ```
//!
//! Values are whole cells or a named step of the spacing scale, and
//! negative values clamp to zero.

/// Named spacing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceScale {
    /// 0 cells.
    None,
    /// 1 cell.
    Xs,
    /// 1 cell.
    Sm,
    /// 2 cells.
    Md,
    /// 3 cells.
    Lg,
    /// 4 cells.
    Xl,
}

impl SpaceScale {
    /// Width of this step in cells.
    pub const fn cells(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Xs | Self::Sm => 1,
            Self::Md => 2,
            Self::Lg => 3,
            Self::Xl => 4,
        }
    }
}

/// One spacing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpacingValue {
    /// Whole cells.
    Cells(i32),
    /// A named step.
    Named(SpaceScale),
}

impl SpacingValue {
    /// Resolve to non-negative cells.
    #[inline]
    pub const fn cells(self) -> i32 {
        let raw = match self {
            Self::Cells(n) => n,
            Self::Named(scale) => scale.cells(),
        };
        if raw < 0 {
            0
        } else {
            raw
        }
    }
}

impl From<i32> for SpacingValue {
    fn from(n: i32) -> Self {
        Self::Cells(n)
    }
}

impl From<SpaceScale> for SpacingValue {
    fn from(scale: SpaceScale) -> Self {
        Self::Named(scale)
    }
}

/// Padding or margin as written on a node, before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Spacing {
    /// All sides.
    pub p: Option<SpacingValue>,
    /// Left and right.
    pub px: Option<SpacingValue>,
    /// Top and bottom.
    pub py: Option<SpacingValue>,
    /// Top.
    pub pt: Option<SpacingValue>,
    /// Right.
    pub pr: Option<SpacingValue>,
    /// Bottom.
    pub pb: Option<SpacingValue>,
    /// Left.
    pub pl: Option<SpacingValue>,
}

impl Spacing {
    /// No spacing on any side.
    pub const NONE: Self = Self {
        p: None,
        px: None,
        py: None,
        pt: None,
        pr: None,
        pb: None,
        pl: None,
    };

    /// Same value on every side.
    pub fn all(value: impl Into<SpacingValue>) -> Self {
        Self {
            p: Some(value.into()),
            ..Self::default()
        }
    }

    /// Horizontal and vertical values.
    pub fn xy(x: impl Into<SpacingValue>, y: impl Into<SpacingValue>) -> Self {
        Self {
            px: Some(x.into()),
            py: Some(y.into()),
            ..Self::default()
        }
    }

    /// Resolve to per-side cells.
    pub fn resolve(&self) -> Edges {
        let side = |own: Option<SpacingValue>, axis: Option<SpacingValue>| {
            own.or(axis).or(self.p).map_or(0, SpacingValue::cells)
        };
        Edges {
            top: side(self.pt, self.py),
            right: side(self.pr, self.px),
            bottom: side(self.pb, self.py),
            left: side(self.pl, self.px),
        }
    }
}

/// Resolved per-side cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Edges {
    /// Top.
    pub top: i32,
    /// Right.
    pub right: i32,
    /// Bottom.
    pub bottom: i32,
    /// Left.
    pub left: i32,
}

impl Edges {
    /// Same cells on every side.
    pub const fn uniform(n: i32) -> Self {
        Self {
            top: n,
            right: n,
            bottom: n,
            left: n,
        }
    }

    /// Left plus right.
    #[inline]
    pub const fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    /// Top plus bottom.
    #[inline]
    pub const fn vertical(&self) -> i32 {
        self.top + self.bottom
    }

    /// Side-wise sum.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            top: self.top + other.top,
            right: self.right + other.right,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_precedence() {
        let spacing = Spacing {
            p: Some(1.into()),
            px: Some(2.into()),
            pl: Some(SpaceScale::Xl.into()),
            ..Spacing::default()
        };
        let edges = spacing.resolve();
        assert_eq!(edges, Edges { top: 1, right: 2, bottom: 1, left: 4 });
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(Spacing::all(-3).resolve(), Edges::uniform(0));
    }

    #[test]
    fn test_named_scale() {
        assert_eq!(Spacing::xy(SpaceScale::Md, SpaceScale::Sm).resolve(), Edges {
            top: 1,
            right: 2,
            bottom: 1,
            left: 2
        });
        assert_eq!(Spacing::default().resolve(), Edges::default());
    }
}
