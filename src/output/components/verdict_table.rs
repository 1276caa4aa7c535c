use crate::model::Verdict;
use crate::output::Theme;
use rich_rust::prelude::*;
use rich_rust::renderables::Cell;

const DETAIL_WIDTH: usize = 72;

/// Renders verdicts as a table, one row per fixture.
pub struct VerdictTable<'a> {
    verdicts: &'a [Verdict],
    theme: &'a Theme,
    title: Option<String>,
    show_passing: bool,
}

impl<'a> VerdictTable<'a> {
    #[must_use]
    pub fn new(verdicts: &'a [Verdict], theme: &'a Theme) -> Self {
        Self {
            verdicts,
            theme,
            title: None,
            show_passing: true,
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Hide PASS rows so failures stand out in large runs.
    #[must_use]
    pub const fn failures_only(mut self) -> Self {
        self.show_passing = false;
        self
    }

    #[must_use]
    pub fn build(&self) -> Table {
        let mut table = Table::new()
            .box_style(self.theme.box_style)
            .border_style(self.theme.table_border.clone())
            .header_style(self.theme.table_header.clone());

        if let Some(ref title) = self.title {
            table = table.title(Text::new(title));
        }

        table = table
            .with_column(Column::new("Fixture").min_width(12))
            .with_column(Column::new("Status").min_width(8))
            .with_column(Column::new("Runs").min_width(16))
            .with_column(Column::new("Detail").max_width(DETAIL_WIDTH));

        for verdict in self.verdicts {
            if !self.show_passing && verdict.status == crate::model::VerdictStatus::Pass {
                continue;
            }
            let runs = verdict
                .runs
                .iter()
                .map(|run| format!("{} {}ms", run.config, run.duration_ms))
                .collect::<Vec<_>>()
                .join(", ");

            table.add_row(Row::new(vec![
                Cell::new(Text::new(&verdict.fixture_id)).style(self.theme.fixture_id.clone()),
                Cell::new(Text::new(verdict.status.as_str()))
                    .style(self.theme.status_style(verdict.status)),
                Cell::new(Text::new(runs)).style(self.theme.muted.clone()),
                Cell::new(Text::new(first_line(verdict.detail.as_deref())))
                    .style(self.theme.detail.clone()),
            ]));
        }

        table
    }
}

fn first_line(detail: Option<&str>) -> String {
    let line = detail.and_then(|d| d.lines().next()).unwrap_or_default();
    if line.chars().count() > DETAIL_WIDTH {
        let mut short: String = line.chars().take(DETAIL_WIDTH - 3).collect();
        short.push_str("...");
        short
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_truncates() {
        assert_eq!(first_line(None), "");
        assert_eq!(first_line(Some("a\nb")), "a");
        let long = "x".repeat(100);
        assert_eq!(first_line(Some(&long)).chars().count(), DETAIL_WIDTH);
    }
}
