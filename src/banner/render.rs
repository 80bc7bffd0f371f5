use std::fmt::Write;

use crate::banner::state::{BannerLine, BannerView};

const ACTIVE_HEADING: &str = "Sedang berlangsung";
const SOON_HEADING: &str = "Segera dimulai";

/// Plain-text rendering of a banner for the terminal.
pub fn render_text(view: &BannerView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}]", view.clock);
    render_section(&mut out, ACTIVE_HEADING, &view.active);
    render_section(&mut out, SOON_HEADING, &view.starting_soon);
    out
}

fn render_section(out: &mut String, heading: &str, lines: &[BannerLine]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {heading}:");
    for line in lines {
        let _ = writeln!(
            out,
            "    {} {} | {} | {} | {}",
            line.code, line.name, line.time_range, line.location, line.lecturer
        );
        let _ = writeln!(out, "      {}", line.label);
    }
}
