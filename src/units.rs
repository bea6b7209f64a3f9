/// Frequency in Hertz.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Hertz(pub f64);

impl std::fmt::Display for Hertz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} MHz", self.as_mhz())
    }
}

impl Hertz {
    pub const fn mhz(mhz: f64) -> Self {
        Self(mhz * 1e6)
    }

    pub const fn as_hz(self) -> f64 {
        self.0
    }

    pub fn as_mhz(self) -> f64 {
        self.0 / 1e6
    }

    /// True for finite, strictly positive values.
    pub fn is_positive(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

/// Gain in Decibels (dB).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Decibels(pub f64);

impl std::fmt::Display for Decibels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} dB", self.0)
    }
}

impl Decibels {
    pub const fn as_db(self) -> f64 {
        self.0
    }
}
