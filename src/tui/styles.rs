//! Color palette and styles.
//!
//! Warm coffee tones for chrome, with the usual red/blue split for
//! attributions pushing a prediction up or down.

use ratatui::style::{Color, Modifier, Style};

/// Couponwise theme color palette.
pub struct CouponTheme;

impl CouponTheme {
    // === Primary Colors ===

    /// Amber - Primary color
    pub const PRIMARY: Color = Color::Rgb(217, 119, 6); // #D97706

    /// Lighter amber for highlights
    pub const PRIMARY_LIGHT: Color = Color::Rgb(251, 191, 36); // #FBBF24

    // === Secondary Colors ===

    /// Light stone for borders
    pub const SECONDARY_LIGHT: Color = Color::Rgb(168, 162, 158); // #A8A29E

    // === Semantic Colors ===

    /// Green - Accepted
    pub const SUCCESS: Color = Color::Rgb(34, 197, 94); // #22C55E

    /// Red - Rejected / error
    pub const DANGER: Color = Color::Rgb(239, 68, 68); // #EF4444

    /// Attribution raising the probability
    pub const PUSH_UP: Color = Color::Rgb(255, 0, 81); // #FF0051

    /// Attribution lowering the probability
    pub const PUSH_DOWN: Color = Color::Rgb(0, 139, 251); // #008BFB

    // === Background Colors ===

    pub const BG_DARK: Color = Color::Rgb(28, 25, 23); // #1C1917

    // === Text Colors ===

    pub const TEXT_PRIMARY: Color = Color::Rgb(250, 250, 249); // #FAFAF9
    pub const TEXT_SECONDARY: Color = Color::Rgb(168, 162, 158); // #A8A29E
    pub const TEXT_MUTED: Color = Color::Rgb(120, 113, 108); // #78716C

    // === Preset Styles ===

    /// Style for titles
    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for panel titles
    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::DANGER)
    }

    /// Style for the selected form row
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for focused elements
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::SECONDARY_LIGHT)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    /// Style for key hints
    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for key descriptions
    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Accept/reject decision style
    #[must_use]
    pub fn decision(accepted: bool) -> Style {
        if accepted {
            Self::success()
        } else {
            Self::danger()
        }
    }

    /// Attribution bar style by sign
    #[must_use]
    pub fn contribution(value: f64) -> Style {
        if value >= 0.0 {
            Style::default().fg(Self::PUSH_UP)
        } else {
            Style::default().fg(Self::PUSH_DOWN)
        }
    }
}
