use crate::model::VerdictStatus;
use crate::output::Theme;
use crate::report::{ConfigTiming, Summary};
use rich_rust::prelude::*;

/// Renders verdict counts as a panel-style table.
pub struct SummaryPanel<'a> {
    title: String,
    summary: &'a Summary,
    theme: &'a Theme,
}

impl<'a> SummaryPanel<'a> {
    pub fn new(title: impl Into<String>, summary: &'a Summary, theme: &'a Theme) -> Self {
        Self {
            title: title.into(),
            summary,
            theme,
        }
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.panel_border.clone())
            .title(Text::styled(&self.title, self.theme.panel_title.clone()))
            .with_column(Column::new("Status").min_width(10))
            .with_column(
                Column::new("Count")
                    .justify(JustifyMethod::Right)
                    .min_width(6),
            );

        for status in VerdictStatus::ALL {
            table.add_row(Row::new(vec![
                Cell::new(Text::styled(status.as_str(), self.theme.status_style(status))),
                Cell::new(Text::new(self.summary.count(status).to_string())),
            ]));
        }
        table.add_row(Row::new(vec![
            Cell::new(Text::styled("TOTAL", self.theme.emphasis.clone())),
            Cell::new(Text::new(self.summary.total.to_string())),
        ]));

        table
    }
}

/// Renders per-config timing.
pub struct TimingTable<'a> {
    timings: &'a [ConfigTiming],
    theme: &'a Theme,
}

impl<'a> TimingTable<'a> {
    #[must_use]
    pub const fn new(timings: &'a [ConfigTiming], theme: &'a Theme) -> Self {
        Self { timings, theme }
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone())
            .title(Text::new("Timing"))
            .with_column(Column::new("Config").min_width(10))
            .with_column(Column::new("Runs").justify(JustifyMethod::Right))
            .with_column(Column::new("Total ms").justify(JustifyMethod::Right))
            .with_column(Column::new("Max ms").justify(JustifyMethod::Right));

        for timing in self.timings {
            table.add_row(Row::new(vec![
                Cell::new(Text::new(&timing.config)).style(self.theme.config_name.clone()),
                Cell::new(Text::new(timing.runs.to_string())),
                Cell::new(Text::new(timing.total_ms.to_string())),
                Cell::new(Text::new(timing.max_ms.to_string())),
            ]));
        }

        table
    }
}
