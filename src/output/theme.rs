//! Theme and color definitions for rich output.

use crate::model::VerdictStatus;
use rich_rust::r#box::ROUNDED;
use rich_rust::prelude::*;

fn color(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |color| Style::new().color(color))
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub info: Style,
    pub dimmed: Style,
    pub muted: Style,
    pub emphasis: Style,

    pub fixture_id: Style,
    pub config_name: Style,
    pub detail: Style,

    pub status_pass: Style,
    pub status_mismatch: Style,
    pub status_error: Style,
    pub status_timeout: Style,
    pub status_skipped: Style,

    pub table_header: Style,
    pub table_border: Style,
    pub panel_title: Style,
    pub panel_border: Style,
    pub section: Style,

    pub box_style: &'static BoxChars,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: color("green").bold(),
            error: color("red").bold(),
            warning: color("yellow").bold(),
            info: color("blue"),
            dimmed: Style::new().dim(),
            muted: color("bright_black"),
            emphasis: Style::new().bold(),

            fixture_id: color("cyan").bold(),
            config_name: color("magenta"),
            detail: Style::new().italic(),

            status_pass: color("green"),
            status_mismatch: color("red").bold(),
            status_error: color("red"),
            status_timeout: color("yellow").bold(),
            status_skipped: color("bright_black"),

            table_header: Style::new().bold(),
            table_border: color("bright_black"),
            panel_title: Style::new().bold(),
            panel_border: color("bright_black"),
            section: color("cyan").bold(),

            box_style: &ROUNDED,
        }
    }
}

impl Theme {
    #[must_use]
    pub fn status_style(&self, status: VerdictStatus) -> Style {
        match status {
            VerdictStatus::Pass => self.status_pass.clone(),
            VerdictStatus::Mismatch => self.status_mismatch.clone(),
            VerdictStatus::Error => self.status_error.clone(),
            VerdictStatus::Timeout => self.status_timeout.clone(),
            VerdictStatus::Skipped => self.status_skipped.clone(),
        }
    }
}
