//! Customer/context profile form.
//!
//! One row per record field. Selectors cycle through their fixed domain,
//! sliders step inside their bounds. The form never holds a value outside a
//! field's domain, so converting it back into a record only fails on a bug.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::record::{Categorical, AGE_RANGE, TEMPERATURE_RANGE};
use crate::domain::{CouponRecord, RawRow, RawValue, RecordError};
use crate::tui::styles::CouponTheme;

use super::{key_hints, render_header};

/// Editable value of one form row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Selector over category labels
    Choice {
        options: Vec<&'static str>,
        index: usize,
    },
    /// 0/1 radio
    Flag { value: bool },
    /// Integer slider
    Range { min: i32, max: i32, value: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Record column name
    pub column: &'static str,
    pub kind: FieldKind,
}

impl FormField {
    fn choice<T: Categorical>(column: &'static str, value: T) -> Self {
        Self {
            column,
            kind: FieldKind::Choice {
                options: T::ALL.iter().map(|v| v.label()).collect(),
                index: value.position(),
            },
        }
    }

    fn flag(column: &'static str, value: bool) -> Self {
        Self {
            column,
            kind: FieldKind::Flag { value },
        }
    }

    fn range(column: &'static str, (min, max): (i32, i32), value: i32) -> Self {
        Self {
            column,
            kind: FieldKind::Range { min, max, value },
        }
    }

    /// Step the value forward (`delta > 0`) or backward.
    fn step(&mut self, delta: i32) {
        match &mut self.kind {
            FieldKind::Choice { options, index } => {
                let n = options.len() as i64;
                *index = (*index as i64 + i64::from(delta)).rem_euclid(n) as usize;
            }
            FieldKind::Flag { value } => *value = !*value,
            FieldKind::Range { min, max, value } => {
                *value = (*value + delta).clamp(*min, *max);
            }
        }
    }

    /// Text shown in the form.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.kind {
            FieldKind::Choice { options, index } => options[*index].to_string(),
            FieldKind::Flag { value } => u8::from(*value).to_string(),
            FieldKind::Range { min, max, value } => format!("{value}  ({min}..{max})"),
        }
    }

    fn raw(&self) -> RawValue {
        match &self.kind {
            FieldKind::Choice { options, index } => RawValue::Text(options[*index].to_string()),
            FieldKind::Flag { value } => RawValue::Number(if *value { 1.0 } else { 0.0 }),
            FieldKind::Range { value, .. } => RawValue::Number(f64::from(*value)),
        }
    }
}

/// Profile form state
#[derive(Debug, Clone)]
pub struct ProfileFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for ProfileFormState {
    fn default() -> Self {
        Self::from_record(&CouponRecord::default())
    }
}

impl ProfileFormState {
    /// Form pre-filled with the values of `r`.
    #[must_use]
    pub fn from_record(r: &CouponRecord) -> Self {
        Self {
            fields: vec![
                FormField::choice("destination", r.destination),
                FormField::choice("passanger", r.passenger),
                FormField::choice("weather", r.weather),
                FormField::range("temperature", TEMPERATURE_RANGE, r.temperature),
                FormField::choice("coupon", r.coupon),
                FormField::choice("expiration", r.expiration),
                FormField::choice("gender", r.gender),
                FormField::range("age", AGE_RANGE, r.age),
                FormField::choice("maritalStatus", r.marital_status),
                FormField::flag("has_children", r.has_children),
                FormField::choice("education", r.education),
                FormField::choice("occupation", r.occupation),
                FormField::choice("income", r.income),
                FormField::choice("car", r.car),
                FormField::choice("Bar", r.bar),
                FormField::choice("CoffeeHouse", r.coffee_house),
                FormField::choice("CarryAway", r.carry_away),
                FormField::choice("RestaurantLessThan20", r.restaurant_less_than_20),
                FormField::choice("Restaurant20To50", r.restaurant_20_to_50),
                FormField::flag("toCoupon_GEQ5min", r.to_coupon_geq_5min),
                FormField::flag("toCoupon_GEQ15min", r.to_coupon_geq_15min),
                FormField::flag("toCoupon_GEQ25min", r.to_coupon_geq_25min),
            ],
            selected_field: 0,
            error_message: None,
        }
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    pub fn increment(&mut self) {
        self.fields[self.selected_field].step(1);
        self.error_message = None;
    }

    pub fn decrement(&mut self) {
        self.fields[self.selected_field].step(-1);
        self.error_message = None;
    }

    /// Replace every value with the sample profile, keeping the cursor.
    pub fn load_sample_data(&mut self) {
        let selected = self.selected_field;
        *self = Self::from_record(&CouponRecord::sample());
        self.selected_field = selected;
    }

    /// Back to the form defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Convert the form into a validated record.
    ///
    /// # Errors
    /// Returns error if a field holds a value outside its domain.
    pub fn to_record(&self) -> Result<CouponRecord, RecordError> {
        let row: RawRow = self
            .fields
            .iter()
            .map(|field| (field.column.to_string(), field.raw()))
            .collect();
        CouponRecord::from_row(&row)
    }
}

/// Render the profile form
pub fn render_profile_form(f: &mut Frame, area: Rect, state: &ProfileFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_header(
        f,
        chunks[0],
        "Customer Profile",
        "Driving scenario, demographics and venue habits",
    );
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &ProfileFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;

    render_field_column(
        f,
        columns[0],
        " Context ",
        &state.fields[..mid],
        0,
        state.selected_field,
    );
    render_field_column(
        f,
        columns[1],
        " Customer ",
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    title: &str,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let focused = (offset..offset + fields.len()).contains(&selected);
    let block = Block::default()
        .title(Span::styled(title.to_string(), CouponTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(if focused {
            CouponTheme::border_focused()
        } else {
            CouponTheme::border()
        });

    let lines: Vec<Line> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let is_selected = offset + i == selected;
            let label = format!(" {:<22}", field.column);
            if is_selected {
                Line::from(vec![
                    Span::styled(label, CouponTheme::focused()),
                    Span::styled(format!("◀ {} ▶", field.display()), CouponTheme::selected()),
                ])
            } else {
                Line::from(vec![
                    Span::styled(label, CouponTheme::text_secondary()),
                    Span::styled(format!("  {}", field.display()), CouponTheme::text()),
                ])
            }
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &ProfileFormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", CouponTheme::danger()),
            Span::styled(err.clone(), CouponTheme::danger()),
        ])
    } else {
        key_hints(&[
            ("↑↓", "Navigate"),
            ("←→", "Change"),
            ("Enter", "Predict"),
            ("S", "Sample"),
            ("R", "Reset"),
            ("Esc", "Back"),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(CouponTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::COLUMNS;

    #[test]
    fn test_form_covers_every_column_in_order() {
        let form = ProfileFormState::default();
        let columns: Vec<&str> = form.fields.iter().map(|f| f.column).collect();
        assert_eq!(columns, COLUMNS);
    }

    #[test]
    fn test_default_form_round_trips_to_default_record() {
        let form = ProfileFormState::default();
        assert_eq!(form.to_record().expect("valid"), CouponRecord::default());

        let sample = ProfileFormState::from_record(&CouponRecord::sample());
        assert_eq!(sample.to_record().expect("valid"), CouponRecord::sample());
    }

    #[test]
    fn test_choice_wraps_around() {
        let mut form = ProfileFormState::default();
        form.decrement();
        let record = form.to_record().expect("valid");
        assert_eq!(record.destination.label(), "Work");

        form.increment();
        assert_eq!(form.to_record().expect("valid"), CouponRecord::default());
    }

    #[test]
    fn test_sliders_clamp_to_bounds() {
        let mut form = ProfileFormState::default();
        form.selected_field = 7; // age
        for _ in 0..100 {
            form.increment();
        }
        assert_eq!(form.to_record().expect("valid").age, AGE_RANGE.1);
        for _ in 0..100 {
            form.decrement();
        }
        assert_eq!(form.to_record().expect("valid").age, AGE_RANGE.0);
    }

    #[test]
    fn test_flags_toggle() {
        let mut form = ProfileFormState::default();
        form.selected_field = 9; // has_children
        form.increment();
        assert!(form.to_record().expect("valid").has_children);
        form.decrement();
        assert!(!form.to_record().expect("valid").has_children);
    }

    #[test]
    fn test_navigation_wraps_and_sample_keeps_cursor() {
        let mut form = ProfileFormState::default();
        form.prev_field();
        assert_eq!(form.selected_field, COLUMNS.len() - 1);
        form.next_field();
        assert_eq!(form.selected_field, 0);

        form.selected_field = 5;
        form.load_sample_data();
        assert_eq!(form.selected_field, 5);
        form.reset();
        assert_eq!(form.selected_field, 0);
    }
}
