//! Dashboard view: Main overview screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::adapters::{AssetBundle, ExplainerSettings};
use crate::ports::Preprocessor;
use crate::tui::styles::CouponTheme;

use super::{key_hints, render_header};

/// Most recent decision, for the activity panel.
#[derive(Debug, Clone, PartialEq)]
pub struct LastDecision {
    pub label: &'static str,
    pub probability: f64,
    pub accepted: bool,
}

/// Dashboard state for rendering.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub asset_dir: String,
    pub threshold: String,
    pub n_trees: usize,
    pub n_features: usize,
    pub background_rows: usize,
    /// (artifact, short fingerprint)
    pub fingerprints: Vec<(&'static str, String)>,
    pub explainer: String,
    pub predictions: usize,
    pub accepted: usize,
    pub last: Option<LastDecision>,
}

impl DashboardState {
    /// Static part of the dashboard, taken from the loaded assets.
    #[must_use]
    pub fn from_assets(
        assets: &AssetBundle,
        settings: &ExplainerSettings,
        background_rows: usize,
    ) -> Self {
        let short = |hash: &str| hash.chars().take(12).collect::<String>();

        let mut fingerprints = vec![
            ("model", short(&assets.fingerprints.model)),
            ("pipeline", short(&assets.fingerprints.pipeline)),
            ("threshold", short(&assets.fingerprints.threshold)),
        ];
        if let Some(hash) = &assets.fingerprints.background {
            fingerprints.push(("background", short(hash)));
        }

        let asset_dir = assets
            .paths
            .model
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Self {
            asset_dir,
            threshold: assets.threshold.to_string(),
            n_trees: assets.classifier.n_trees(),
            n_features: assets.preprocessor.output_dim(),
            background_rows,
            fingerprints,
            explainer: format!(
                "{} (permutations={}, seed={}, exact<= {})",
                settings.algorithm,
                settings.permutations,
                settings.seed,
                settings.exact_max_features
            ),
            ..Self::default()
        }
    }

    /// Count one completed prediction.
    pub fn record(&mut self, label: &'static str, probability: f64, accepted: bool) {
        self.predictions += 1;
        if accepted {
            self.accepted += 1;
        }
        self.last = Some(LastDecision {
            label,
            probability,
            accepted,
        });
    }
}

/// Render the main dashboard view.
pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0], "Couponwise", "In-Vehicle Coupon Acceptance");

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_status_panels(f, columns[0], state);
    render_activity(f, columns[1], state);
}

fn render_status_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Assets
            Constraint::Length(4), // Explainer
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    let item = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {label:<12}"), CouponTheme::text_secondary()),
            Span::styled(value, CouponTheme::text()),
        ])
    };

    let mut assets = vec![
        Line::from(vec![
            Span::styled("  OK ", CouponTheme::success()),
            Span::styled(state.asset_dir.clone(), CouponTheme::text()),
        ]),
        item(
            "Model",
            format!("{} trees, {} features", state.n_trees, state.n_features),
        ),
        item("Threshold", state.threshold.clone()),
    ];
    for (name, hash) in &state.fingerprints {
        assets.push(Line::from(vec![
            Span::styled(format!("  {name:<12}"), CouponTheme::text_secondary()),
            Span::styled(format!("sha256:{hash}"), CouponTheme::text_muted()),
        ]));
    }

    let assets_block = Block::default()
        .title(Span::styled(" Assets ", CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border());
    f.render_widget(Paragraph::new(assets).block(assets_block), chunks[0]);

    let background = if state.background_rows == 0 {
        Span::styled("none (attributions will be zero)", CouponTheme::danger())
    } else {
        Span::styled(format!("{} rows", state.background_rows), CouponTheme::text())
    };
    let explainer = vec![
        item("Shapley", state.explainer.clone()),
        Line::from(vec![
            Span::styled(format!("  {:<12}", "Background"), CouponTheme::text_secondary()),
            background,
        ]),
    ];
    let explainer_block = Block::default()
        .title(Span::styled(" Explainer ", CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border());
    f.render_widget(Paragraph::new(explainer).block(explainer_block), chunks[1]);

    let actions = vec![
        key_hints(&[("N", "New profile")]),
        key_hints(&[("S", "Sample profile")]),
        key_hints(&[("Q", "Quit")]),
    ];
    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border());
    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[2]);
}

fn render_activity(f: &mut Frame, area: Rect, state: &DashboardState) {
    let block = Block::default()
        .title(Span::styled(" Session ", CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CouponTheme::border());

    let Some(last) = &state.last else {
        let empty = Paragraph::new(Line::from(vec![Span::styled(
            "No predictions yet. Press [N] to start.",
            CouponTheme::text_muted(),
        )]))
        .block(block);
        f.render_widget(empty, area);
        return;
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Predictions: ", CouponTheme::text_secondary()),
            Span::styled(state.predictions.to_string(), CouponTheme::text()),
            Span::styled("   Accepted: ", CouponTheme::text_secondary()),
            Span::styled(state.accepted.to_string(), CouponTheme::success()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Last: ", CouponTheme::text_secondary()),
            Span::styled(last.label, CouponTheme::decision(last.accepted)),
            Span::styled(
                format!("  p={:.2}", last.probability),
                CouponTheme::text(),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}
