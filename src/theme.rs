//! Presentation state: color theme and zoom level.
//!
//! [`Presentation`] is an immutable `Copy` value; the session replaces it
//! wholesale on every change.

use serde::Serialize;

pub const MIN_ZOOM: u16 = 50;
pub const MAX_ZOOM: u16 = 200;
pub const DEFAULT_ZOOM: u16 = 100;
pub const ZOOM_STEP: u16 = 10;

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub const fn palette(self) -> Palette {
        match self {
            Self::Dark => Palette {
                background: "#181818",
                text: "#e0e0e0",
                heading: "#ffffff",
                link: "#4a9eff",
                code_background: "#242424",
                pre_background: "#0d0d0d",
                border: "#333333",
                quote_background: "#242424",
                muted: "#999999",
                syntax: SyntaxColors {
                    keyword: "#c678dd",
                    string: "#98c379",
                    number: "#d19a66",
                    constant: "#d19a66",
                    comment: "#7f848e",
                    function: "#61afef",
                    type_name: "#e5c07b",
                    variable: "#e06c75",
                    operator: "#56b6c2",
                    punctuation: "#abb2bf",
                },
            },
            Self::Light => Palette {
                background: "#ffffff",
                text: "#333333",
                heading: "#1a1a1a",
                link: "#0066cc",
                code_background: "#f5f5f5",
                pre_background: "#f8f8f8",
                border: "#e0e0e0",
                quote_background: "#f9f9f9",
                muted: "#666666",
                syntax: SyntaxColors {
                    keyword: "#a626a4",
                    string: "#50a14f",
                    number: "#986801",
                    constant: "#986801",
                    comment: "#a0a1a7",
                    function: "#4078f2",
                    type_name: "#c18401",
                    variable: "#e45649",
                    operator: "#0184bc",
                    punctuation: "#383a42",
                },
            },
        }
    }
}

/// CSS colors for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub heading: &'static str,
    pub link: &'static str,
    pub code_background: &'static str,
    pub pre_background: &'static str,
    pub border: &'static str,
    pub quote_background: &'static str,
    pub muted: &'static str,
    pub syntax: SyntaxColors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxColors {
    pub keyword: &'static str,
    pub string: &'static str,
    pub number: &'static str,
    pub constant: &'static str,
    pub comment: &'static str,
    pub function: &'static str,
    pub type_name: &'static str,
    pub variable: &'static str,
    pub operator: &'static str,
    pub punctuation: &'static str,
}

/// Zoom level in percent, always within `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Zoom(u16);

impl Default for Zoom {
    fn default() -> Self {
        Self(DEFAULT_ZOOM)
    }
}

impl Zoom {
    /// Clamp `percent` into range; out-of-range requests are logged.
    pub fn new(percent: i32) -> Self {
        let clamped = percent.clamp(i32::from(MIN_ZOOM), i32::from(MAX_ZOOM));
        if clamped != percent {
            tracing::warn!(requested = percent, applied = clamped, "zoom clamped");
        }
        // In range after the clamp above.
        Self(u16::try_from(clamped).unwrap_or(DEFAULT_ZOOM))
    }

    pub const fn percent(self) -> u16 {
        self.0
    }

    pub fn zoomed_in(self) -> Self {
        Self::new(i32::from(self.0) + i32::from(ZOOM_STEP))
    }

    pub fn zoomed_out(self) -> Self {
        Self::new(i32::from(self.0) - i32::from(ZOOM_STEP))
    }

    /// Scale factor, `1.0` at 100%.
    pub fn factor(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Theme and zoom as one immutable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Presentation {
    pub theme: Theme,
    pub zoom: Zoom,
}

impl Presentation {
    pub const fn new(theme: Theme, zoom: Zoom) -> Self {
        Self { theme, zoom }
    }

    #[must_use]
    pub const fn with_theme(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }

    #[must_use]
    pub const fn with_zoom(self, zoom: Zoom) -> Self {
        Self { zoom, ..self }
    }

    pub const fn palette(self) -> Palette {
        self.theme.palette()
    }
}
