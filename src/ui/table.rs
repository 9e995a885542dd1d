use tabled::{settings::Style, Table, Tabled};
use crate::export::ExportSummary;

#[derive(Tabled)]
pub struct ReportRow {
    #[tabled(rename = "Report")]
    pub report: String,
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<ReportRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, report: &str, file: &str, rows: usize) {
        self.rows.push(ReportRow {
            report: report.to_string(),
            file: file.to_string(),
            rows,
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn report_table(summary: &ExportSummary) -> String {
    let mut builder = TableBuilder::new();
    for report in summary.reports() {
        builder.add_row(report.kind.as_str(), &report.path.display().to_string(), report.rows);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportReport, ReportKind};
    use std::path::PathBuf;

    #[test]
    fn test_empty_table() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_report_table_lists_both_reports() {
        let summary = ExportSummary {
            diff: ExportReport { kind: ReportKind::Diff, path: PathBuf::from("diff.txt"), rows: 3 },
            index: ExportReport { kind: ReportKind::Index, path: PathBuf::from("index.txt"), rows: 12 },
        };
        let table = report_table(&summary);
        assert!(table.contains("diff.txt"));
        assert!(table.contains("index.txt"));
        assert!(table.contains("12"));
    }
}
