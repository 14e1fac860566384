//! UI module: View components for the TUI.

pub mod dashboard;
pub mod profile;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::CouponTheme;

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "Predictions are model estimates learned from survey answers about in-vehicle coupons.",
            CouponTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Attributions are relative to the background sample and describe the model, not the customer.",
            CouponTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(CouponTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

/// Header bar shared by every screen.
pub(crate) fn render_header(f: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", CouponTheme::text()),
        Span::styled(title.to_string(), CouponTheme::title()),
        Span::styled(" │ ", CouponTheme::text_muted()),
        Span::styled(subtitle.to_string(), CouponTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(CouponTheme::border()),
    );

    f.render_widget(header, area);
}

/// Key hint line: `[key] description` pairs.
pub(crate) fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
    Line::from(
        hints
            .iter()
            .flat_map(|(key, desc)| {
                [
                    Span::styled(format!("[{key}] "), CouponTheme::key_hint()),
                    Span::styled(format!("{desc} "), CouponTheme::key_desc()),
                ]
            })
            .collect::<Vec<_>>(),
    )
}
