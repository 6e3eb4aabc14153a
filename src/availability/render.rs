//! Text rendering of the availability view
//!
//! Times are shown in 12-hour form; the stored `HH:MM` value is untouched.

use std::fmt::Write;

use crate::models::{convert_to_12_hour, Bed};

use super::state::AvailabilityState;

/// Beds per grid row
const GRID_COLUMNS: usize = 4;

const MARK_AVAILABLE: char = '·';
const MARK_BOOKED: char = '■';
const MARK_SELECTED: char = '▶';

/// Render the whole view
pub fn render(state: &AvailabilityState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Bed Availability");
    let _ = writeln!(out, "{:=<16}", "");
    if let Some(synced) = state.last_synced {
        let _ = writeln!(out, "Last synced: {}", synced.format("%H:%M:%S"));
    }

    if let Some(error) = &state.error {
        let _ = writeln!(out, "! {error}");
    }
    if let Some(success) = state.success_message() {
        let _ = writeln!(out, "✓ {success}");
    }
    if state.loading.unbooking {
        let _ = writeln!(out, "Unbooking...");
    }
    if state.loading.general {
        let _ = writeln!(out, "Refreshing...");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Bed Selection");
    if state.loading.initialize {
        let _ = writeln!(out, "  Initializing beds...");
    } else {
        out.push_str(&render_grid(state));
    }
    let _ = writeln!(
        out,
        "  {MARK_AVAILABLE} Available   {MARK_BOOKED} Booked   {MARK_SELECTED} Selected"
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "Bed Booking");
    let _ = writeln!(
        out,
        "  Available Beds: {}   Booked Beds: {}",
        state.available_count(),
        state.booked_count()
    );

    if let Some(bed) = &state.selected_bed {
        out.push_str(&render_form(state, bed.id));
    }

    let _ = writeln!(out);
    out.push_str(&render_booked_list(state.beds.iter()));

    out
}

/// One grid cell
pub fn render_cell(bed: &Bed, selected: bool) -> String {
    let mark = if selected {
        MARK_SELECTED
    } else if bed.is_booked {
        MARK_BOOKED
    } else {
        MARK_AVAILABLE
    };

    let label = if bed.is_booked {
        format!(
            "{} {}",
            bed.patient_name.as_deref().unwrap_or_default(),
            convert_to_12_hour(bed.time.as_deref().unwrap_or_default())
        )
    } else {
        String::new()
    };

    format!("{:>3} {mark} {label:<20}", bed.id)
}

fn render_grid(state: &AvailabilityState) -> String {
    let mut out = String::new();
    for row in state.beds.chunks(GRID_COLUMNS) {
        let cells: Vec<String> = row
            .iter()
            .map(|bed| render_cell(bed, state.is_selected(bed.id)))
            .collect();
        let _ = writeln!(out, " {}", cells.join(" ").trim_end());
    }
    out
}

fn render_form(state: &AvailabilityState, id: u32) -> String {
    let form = &state.booking_form;
    let submit = if state.loading.booking {
        "Booking..."
    } else if form.is_complete() {
        "Book Bed"
    } else {
        "Book Bed (fill in name and time)"
    };

    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  Book Bed {id}");
    let _ = writeln!(out, "    Patient Name: {}", form.patient_name);
    let _ = writeln!(out, "    Time: {}", form.time);
    let _ = writeln!(out, "    [{submit}]  [Cancel]");
    out
}

/// "Currently Booked Beds" section
pub fn render_booked_list<'a>(beds: impl Iterator<Item = &'a Bed>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Currently Booked Beds");

    let mut any = false;
    for bed in beds.filter(|b| b.is_booked) {
        any = true;
        let _ = writeln!(
            out,
            "  Bed {:<4} {:<24} {}",
            bed.id,
            bed.patient_name.as_deref().unwrap_or_default(),
            convert_to_12_hour(bed.time.as_deref().unwrap_or_default())
        );
    }
    if !any {
        let _ = writeln!(out, "  No beds are currently booked");
    }
    out
}

/// Plain table used by one-shot commands
pub fn render_bed_table(beds: &[Bed]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {:<10} {:<24} {}", "BED", "STATE", "PATIENT", "TIME");
    for bed in beds {
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<24} {}",
            bed.id,
            bed.state().as_str(),
            bed.patient_name.as_deref().unwrap_or("-"),
            bed.time.as_deref().map(convert_to_12_hour).unwrap_or_else(|| "-".to_string())
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::state::FormField;

    fn scenario() -> AvailabilityState {
        AvailabilityState::with_beds(vec![Bed::available(1), Bed::booked(2, "A", "14:30")])
    }

    #[test]
    fn test_cell_shows_12_hour_time() {
        let cell = render_cell(&Bed::booked(1, "B", "09:00"), false);
        assert!(cell.contains("B 9:00 AM"));
        assert!(cell.contains(MARK_BOOKED));
    }

    #[test]
    fn test_cell_marks_selection() {
        let cell = render_cell(&Bed::available(1), true);
        assert!(cell.contains(MARK_SELECTED));
        let cell = render_cell(&Bed::available(1), false);
        assert!(cell.contains(MARK_AVAILABLE));
    }

    #[test]
    fn test_render_stats_and_booked_list() {
        let out = render(&scenario());
        assert!(out.contains("Available Beds: 1   Booked Beds: 1"));
        assert!(out.contains("Bed 2"));
        assert!(out.contains("2:30 PM"));
        assert!(!out.contains("Book Bed 1"));
    }

    #[test]
    fn test_render_form_for_selection() {
        let mut state = scenario();
        state.selected_bed = state.bed(1).cloned();
        state.booking_form.set(FormField::PatientName, "B");

        let out = render(&state);
        assert!(out.contains("Book Bed 1"));
        assert!(out.contains("Patient Name: B"));
        assert!(out.contains("fill in name and time"));
    }

    #[test]
    fn test_render_initializing_hides_grid() {
        let mut state = scenario();
        state.loading.initialize = true;
        let out = render(&state);
        assert!(out.contains("Initializing beds..."));
        assert!(!out.contains("  1 ·"));
    }

    #[test]
    fn test_render_error() {
        let mut state = scenario();
        state.error = Some("Time is required".to_string());
        assert!(render(&state).contains("! Time is required"));
    }

    #[test]
    fn test_empty_booked_list() {
        let beds = [Bed::available(1)];
        assert!(render_booked_list(beds.iter()).contains("No beds are currently booked"));
    }

    #[test]
    fn test_bed_table_keeps_stored_value_out_of_display() {
        let beds = vec![Bed::booked(2, "A", "14:30")];
        let table = render_bed_table(&beds);
        assert!(table.contains("booked"));
        assert!(table.contains("2:30 PM"));
        // Rendering never rewrites the bed itself
        assert_eq!(beds[0].time.as_deref(), Some("14:30"));
    }
}
