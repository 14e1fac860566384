//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Service integration
//!
//! Prediction runs synchronously: submitting the form switches to the result
//! screen in its computing state, the next loop iteration draws that frame and
//! then blocks on predict + explain.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::{
    AssetBundle, AssetPaths, ColumnTransformer, ShapleyExplainer, XgbClassifier,
};
use crate::application::{ExplanationService, PredictionService};
use crate::config::AppConfig;
use crate::domain::{CouponRecord, Explanation, Prediction};

use super::ui::{
    dashboard::{render_dashboard, DashboardState},
    profile::{render_profile_form, ProfileFormState},
    render_disclaimer,
    result::{render_result, ResultState},
};

type Predictor = PredictionService<XgbClassifier, ColumnTransformer>;
type Explainer = ExplanationService<XgbClassifier, ColumnTransformer, ShapleyExplainer>;

/// Current screen/view in the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    ProfileForm,
    Result,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,

    predictor: Predictor,
    explainer: Explainer,

    dashboard_state: DashboardState,
    form_state: ProfileFormState,
    result_state: ResultState,

    /// Record submitted from the form, evaluated after the next draw
    pending: Option<CouponRecord>,
}

impl App {
    /// Load the assets named by `config` and build the services.
    ///
    /// # Errors
    /// Returns error if the assets cannot be loaded or the background sample
    /// does not fit the pipeline.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let paths = AssetPaths::in_dir(&config.asset_dir);
        let assets = Arc::new(AssetBundle::load(&paths, &config.trust).map_err(|e| {
            anyhow!(
                "Failed to load assets from {:?}: {}. Set COUPONWISE_ASSET_DIR to the directory holding the model files.",
                config.asset_dir,
                e
            )
        })?);

        let method = ShapleyExplainer::new(config.explainer.clone());
        let background = method.subsample(&assets.background);

        let predictor = PredictionService::new(
            assets.classifier.clone(),
            assets.preprocessor.clone(),
            assets.threshold,
        );
        let explainer = ExplanationService::new(
            assets.classifier.clone(),
            assets.preprocessor.clone(),
            method,
            &background,
        )?;

        let dashboard_state =
            DashboardState::from_assets(&assets, &config.explainer, explainer.background_rows());

        Ok(Self::with_dependencies(predictor, explainer, dashboard_state))
    }

    /// Create application with injected services.
    #[must_use]
    pub fn with_dependencies(
        predictor: Predictor,
        explainer: Explainer,
        dashboard_state: DashboardState,
    ) -> Self {
        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            predictor,
            explainer,
            dashboard_state,
            form_state: ProfileFormState::default(),
            result_state: ResultState::default(),
            pending: None,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                match self.screen {
                    Screen::Dashboard => render_dashboard(f, chunks[0], &self.dashboard_state),
                    Screen::ProfileForm => render_profile_form(f, chunks[0], &self.form_state),
                    Screen::Result => render_result(f, chunks[0], &self.result_state),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            // The computing frame is on screen now.
            if let Some(record) = self.pending.take() {
                self.complete(&record);
                continue;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key.code, key.modifiers);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Predict and explain one record.
    ///
    /// # Errors
    /// Returns the first failing step.
    pub fn evaluate(&self, record: &CouponRecord) -> crate::Result<(Prediction, Explanation)> {
        let prediction = self.predictor.predict(record)?;
        let explanation = self.explainer.explain(record)?;
        Ok((prediction, explanation))
    }

    fn complete(&mut self, record: &CouponRecord) {
        self.result_state = match self.evaluate(record) {
            Ok((prediction, explanation)) => {
                self.dashboard_state.record(
                    prediction.label(),
                    prediction.probability,
                    prediction.decision,
                );
                ResultState::Complete {
                    prediction,
                    explanation,
                    by_field: true,
                }
            }
            Err(e) => {
                tracing::error!("Prediction failed: {}", e);
                ResultState::Error {
                    message: e.to_string(),
                }
            }
        };
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::ProfileForm => self.handle_form_key(key),
            Screen::Result => self.handle_result_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n') | KeyCode::Char('N') => {
                self.form_state.reset();
                self.screen = Screen::ProfileForm;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.form_state.load_sample_data();
                self.screen = Screen::ProfileForm;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.screen = Screen::Dashboard;
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.form_state.prev_field();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.form_state.next_field();
            }
            KeyCode::Left => {
                self.form_state.decrement();
            }
            KeyCode::Right | KeyCode::Char(' ') => {
                self.form_state.increment();
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                self.form_state.load_sample_data();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.form_state.reset();
            }
            KeyCode::Enter => {
                self.submit_form();
            }
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match &self.result_state {
            ResultState::Complete { .. } => match key {
                KeyCode::Char('g') | KeyCode::Char('G') => {
                    self.result_state.toggle_grouping();
                }
                KeyCode::Enter | KeyCode::Char('e') | KeyCode::Char('E') => {
                    self.screen = Screen::ProfileForm;
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.form_state.reset();
                    self.screen = Screen::ProfileForm;
                }
                KeyCode::Esc => {
                    self.screen = Screen::Dashboard;
                }
                _ => {}
            },
            ResultState::Error { .. } => match key {
                KeyCode::Enter => {
                    self.screen = Screen::ProfileForm;
                }
                KeyCode::Esc => {
                    self.screen = Screen::Dashboard;
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        match self.form_state.to_record() {
            Ok(record) => {
                self.screen = Screen::Result;
                self.result_state = ResultState::Computing;
                self.pending = Some(record);
            }
            Err(e) => {
                self.form_state.error_message = Some(e.to_string());
            }
        }
    }
}
