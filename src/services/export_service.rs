use crate::error::{Error, Result};
use crate::models::test_result::ResultListing;
use crate::services::spreadsheet::{cell_number, open_first_sheet, Header};
use crate::utils::time::format_export_date;
use rust_xlsxwriter::*;
use serde::{Deserialize, Serialize};

pub const EXPORT_HEADERS: [&str; 6] = [
    "Student",
    "Test",
    "Score Achieved",
    "Total Score",
    "Time Taken (s)",
    "Completion Date",
];

/// One exported result line. Pending results carry no score, time or date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Student")]
    pub student: String,
    #[serde(rename = "Test")]
    pub test: String,
    #[serde(rename = "Score Achieved")]
    pub score_achieved: Option<i32>,
    #[serde(rename = "Total Score")]
    pub total_score: Option<i32>,
    #[serde(rename = "Time Taken (s)")]
    pub time_taken: Option<i32>,
    #[serde(rename = "Completion Date")]
    pub completion_date: Option<String>,
}

impl From<&ResultListing> for ExportRow {
    fn from(listing: &ResultListing) -> Self {
        Self {
            student: listing.student_name.clone(),
            test: listing.test_name.clone(),
            score_achieved: listing.score_achieved,
            total_score: listing.total_score,
            time_taken: listing.time_taken,
            completion_date: listing.completion_date.map(format_export_date),
        }
    }
}

pub struct ExportService;

impl ExportService {
    /// Styled single-sheet workbook; the header sits on the first row so the
    /// file can be read back column by column.
    pub fn results_to_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Results")?;

        let header_bg = Color::RGB(0x0F172A);
        let border_color = Color::RGB(0xE2E8F0);
        let alt_row = Color::RGB(0xF8FAFC);

        let widths = [30.0, 30.0, 16.0, 14.0, 16.0, 22.0];
        for (i, width) in widths.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        worksheet.set_row_height(0, 24)?;
        for (i, name) in EXPORT_HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(0, i as u16, *name, &header_format)?;
        }

        for (idx, row) in rows.iter().enumerate() {
            let r = idx as u32 + 1;
            let bg = if idx % 2 == 0 { alt_row } else { Color::White };
            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);

            worksheet.write_string_with_format(r, 0, &row.student, &base_fmt)?;
            worksheet.write_string_with_format(r, 1, &row.test, &base_fmt)?;
            let numbers = [row.score_achieved, row.total_score, row.time_taken];
            for (offset, value) in numbers.iter().enumerate() {
                let col = 2 + offset as u16;
                match value {
                    Some(v) => worksheet.write_number_with_format(r, col, f64::from(*v), &center_fmt)?,
                    None => worksheet.write_blank(r, col, &center_fmt)?,
                };
            }
            match &row.completion_date {
                Some(date) => worksheet.write_string_with_format(r, 5, date, &center_fmt)?,
                None => worksheet.write_blank(r, 5, &center_fmt)?,
            };
        }

        worksheet.set_freeze_panes(1, 0)?;
        if !rows.is_empty() {
            worksheet.autofilter(0, 0, rows.len() as u32, (EXPORT_HEADERS.len() - 1) as u16)?;
        }

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    pub fn results_to_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if rows.is_empty() {
            writer.write_record(EXPORT_HEADERS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("Failed to finish CSV export: {}", e)))
    }

    pub fn rows_from_csv(bytes: &[u8]) -> Result<Vec<ExportRow>> {
        let mut reader = csv::Reader::from_reader(bytes);
        let rows = reader
            .deserialize::<ExportRow>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn rows_from_xlsx(bytes: &[u8]) -> Result<Vec<ExportRow>> {
        let range = open_first_sheet(bytes)?;
        let header = Header::from_range(&range);
        let missing = header.missing(&EXPORT_HEADERS);
        if !missing.is_empty() {
            return Err(Error::MissingColumns(
                missing.into_iter().map(String::from).collect(),
            ));
        }

        let number = |row: &[calamine::Data], name: &str| header.cell(row, name).and_then(cell_number);
        let rows = range
            .rows()
            .skip(1)
            .map(|row| {
                let date = header.raw_text(row, "Completion Date");
                ExportRow {
                    student: header.raw_text(row, "Student"),
                    test: header.raw_text(row, "Test"),
                    score_achieved: number(row, "Score Achieved"),
                    total_score: number(row, "Total Score"),
                    time_taken: number(row, "Time Taken (s)"),
                    completion_date: (!date.is_empty()).then_some(date),
                }
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn listing(student: &str, score: Option<i32>) -> ResultListing {
        let completed = score.is_some();
        ResultListing {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            student_name: student.into(),
            test_id: Uuid::new_v4(),
            test_name: "Quiz1".into(),
            score_achieved: score,
            total_score: completed.then_some(25),
            time_taken: completed.then_some(312),
            completion_date: completed
                .then(|| Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap()),
            status: if completed { "Completed" } else { "Pending" }.into(),
            created_at: Utc::now(),
        }
    }

    fn sample_rows() -> Vec<ExportRow> {
        [
            listing("Aziz Karimov", Some(1)),
            listing("Dilnoza Rahimova", None),
            listing("Bobur Aliyev", Some(23)),
            listing(" Ann Lee ", Some(5)),
        ]
        .iter()
        .map(ExportRow::from)
        .collect()
    }

    #[test]
    fn pending_results_export_empty_cells() {
        let row = ExportRow::from(&listing("Dilnoza Rahimova", None));
        assert_eq!(row.score_achieved, None);
        assert_eq!(row.completion_date, None);

        let csv = ExportService::results_to_csv(&[row]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Student,Test,Score Achieved,Total Score,Time Taken (s),Completion Date")
        );
        assert_eq!(lines.next(), Some("Dilnoza Rahimova,Quiz1,,,,"));
    }

    #[test]
    fn completion_date_is_plain_text() {
        let row = ExportRow::from(&listing("Aziz Karimov", Some(1)));
        assert_eq!(row.completion_date.as_deref(), Some("2024-03-01 14:05:09"));
    }

    #[test]
    fn csv_and_xlsx_carry_the_same_rows() {
        let rows = sample_rows();

        let from_csv = ExportService::rows_from_csv(&ExportService::results_to_csv(&rows).unwrap())
            .unwrap();
        let from_xlsx =
            ExportService::rows_from_xlsx(&ExportService::results_to_xlsx(&rows).unwrap())
                .unwrap();

        assert_eq!(from_csv, rows);
        assert_eq!(from_xlsx, rows);
        assert_eq!(from_xlsx[3].student, " Ann Lee ");
    }

    #[test]
    fn empty_export_still_has_headers() {
        let csv = ExportService::results_to_csv(&[]).unwrap();
        assert!(String::from_utf8(csv).unwrap().starts_with("Student,Test"));
        assert!(ExportService::rows_from_csv(&ExportService::results_to_csv(&[]).unwrap())
            .unwrap()
            .is_empty());

        let xlsx = ExportService::results_to_xlsx(&[]).unwrap();
        assert!(ExportService::rows_from_xlsx(&xlsx).unwrap().is_empty());
    }
}
