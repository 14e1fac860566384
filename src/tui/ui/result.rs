//! Prediction result and attribution ranking.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::domain::{rank, Contribution, Explanation, Prediction};
use crate::tui::styles::CouponTheme;

use super::{key_hints, render_header};

/// Rows shown in the attribution ranking, the last one folding the rest.
pub const MAX_DISPLAY: usize = 10;

const NAME_WIDTH: usize = 30;

/// Result state
#[derive(Debug, Clone, Default)]
pub enum ResultState {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Prediction and explanation are being computed
    Computing,
    Complete {
        prediction: Prediction,
        explanation: Explanation,
        /// Sum attributions per source field instead of per encoded feature
        by_field: bool,
    },
    Error { message: String },
}

impl ResultState {
    /// Flip between per-field and per-feature ranking.
    pub fn toggle_grouping(&mut self) {
        if let Self::Complete { by_field, .. } = self {
            *by_field = !*by_field;
        }
    }
}

/// Ranked contributions as displayed.
#[must_use]
pub fn ranked_contributions(explanation: &Explanation, by_field: bool) -> Vec<Contribution> {
    let contributions = if by_field {
        explanation.by_field()
    } else {
        explanation.per_feature()
    };
    rank(contributions, MAX_DISPLAY)
}

/// Render the result view
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], "Coupon Decision", "Prediction and feature attributions");

    match state {
        ResultState::Idle => render_message(f, chunks[1], "No prediction yet", false),
        ResultState::Computing => render_message(
            f,
            chunks[1],
            "Computing prediction and attributions...",
            false,
        ),
        ResultState::Complete {
            prediction,
            explanation,
            by_field,
        } => render_complete(f, chunks[1], prediction, explanation, *by_field),
        ResultState::Error { message } => render_message(f, chunks[1], message, true),
    }

    render_result_footer(f, chunks[2], state);
}

fn render_message(f: &mut Frame, area: Rect, message: &str, is_error: bool) {
    let (heading, style) = if is_error {
        (Span::styled("! Error", CouponTheme::danger()), CouponTheme::danger())
    } else {
        (Span::raw(""), CouponTheme::border())
    };

    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(heading),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), CouponTheme::text())),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(style));

    f.render_widget(content, area);
}

fn render_complete(
    f: &mut Frame,
    area: Rect,
    prediction: &Prediction,
    explanation: &Explanation,
    by_field: bool,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(area);

    render_decision(f, columns[0], prediction, explanation);
    render_attributions(f, columns[1], explanation, by_field);
}

fn render_decision(f: &mut Frame, area: Rect, prediction: &Prediction, explanation: &Explanation) {
    let block = Block::default()
        .title(Span::styled(" Decision ", CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border_focused());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Label
            Constraint::Length(3), // Probability gauge
            Constraint::Min(0),    // Details
        ])
        .margin(1)
        .split(inner);

    let style = CouponTheme::decision(prediction.decision);
    let label = Paragraph::new(vec![
        Line::from(Span::styled(
            prediction.label(),
            style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            if prediction.decision {
                "Customer is likely to accept the coupon"
            } else {
                "Customer is unlikely to accept the coupon"
            },
            CouponTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(label, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Probability ", CouponTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(CouponTheme::border()),
        )
        .gauge_style(style)
        .ratio(prediction.probability.clamp(0.0, 1.0))
        .label(format!("{:.2}", prediction.probability));
    f.render_widget(gauge, chunks[1]);

    let detail = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{name:<14}"), CouponTheme::text_secondary()),
            Span::styled(value, CouponTheme::text()),
        ])
    };
    let details = Paragraph::new(vec![
        detail("Probability", format!("{:.2}", prediction.probability)),
        detail("Threshold", prediction.threshold.to_string()),
        detail("Margin", format!("{:+.4}", prediction.margin())),
        Line::from(""),
        detail("Base value", format!("{:.4}", explanation.base_value)),
        detail("f(x)", format!("{:.4}", explanation.output_value)),
        detail(
            "Evaluated",
            prediction.evaluated_at.format("%H:%M:%S UTC").to_string(),
        ),
    ]);
    f.render_widget(details, chunks[2]);
}

fn render_attributions(f: &mut Frame, area: Rect, explanation: &Explanation, by_field: bool) {
    let title = if by_field {
        " Attributions by field "
    } else {
        " Attributions by encoded feature "
    };
    let block = Block::default()
        .title(Span::styled(title, CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let ranked = ranked_contributions(explanation, by_field);
    let largest = ranked
        .iter()
        .map(|c| c.value.abs())
        .fold(0.0_f64, f64::max);

    // name | bar | value
    let bar_width = (inner.width as usize).saturating_sub(NAME_WIDTH + 12).max(4);

    let mut lines: Vec<Line> = ranked
        .iter()
        .map(|c| {
            let filled = if largest > 0.0 {
                ((c.value.abs() / largest) * bar_width as f64).round() as usize
            } else {
                0
            };
            Line::from(vec![
                Span::styled(
                    format!(" {:<width$}", truncate(&c.name, NAME_WIDTH), width = NAME_WIDTH),
                    CouponTheme::text(),
                ),
                Span::styled(
                    format!("{:<bar_width$}", "█".repeat(filled)),
                    CouponTheme::contribution(c.value),
                ),
                Span::styled(format!(" {:+.4}", c.value), CouponTheme::contribution(c.value)),
            ])
        })
        .collect();

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            " E[f(x)] = {:.4}   f(x) = {:.4}",
            explanation.base_value, explanation.output_value
        ),
        CouponTheme::text_muted(),
    )));

    f.render_widget(Paragraph::new(lines), inner);
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut out: String = name.chars().take(width - 1).collect();
    out.push('…');
    out
}

fn render_result_footer(f: &mut Frame, area: Rect, state: &ResultState) {
    let content = match state {
        ResultState::Complete { .. } => key_hints(&[
            ("G", "Toggle grouping"),
            ("Enter", "Edit profile"),
            ("N", "New profile"),
            ("Esc", "Dashboard"),
        ]),
        ResultState::Error { .. } => key_hints(&[("Enter", "Back to form"), ("Esc", "Dashboard")]),
        _ => Line::from(vec![Span::styled("Processing...", CouponTheme::text_muted())]),
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(CouponTheme::border()),
    );

    f.render_widget(footer, area);
}
