use crate::dto::account_dto::StudentImportSummary;
use crate::dto::authoring_dto::{ImportTestForm, ImportTestSummary};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::models::account::Role;
use crate::services::spreadsheet::{
    cell_flag, ensure_spreadsheet_extension, open_first_sheet, Header,
};
use crate::services::test_service::{
    ensure_subject_exists, insert_answer, insert_question, insert_test, AUTHOR_ROLES,
};
use crate::utils::crypto::hash_password;
use calamine::{Data, Range};
use rust_xlsxwriter::{Format, Workbook};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub const QUESTION_TEXT_COLUMN: &str = "Question Text";
pub const QUESTION_TYPE_COLUMN: &str = "Question Type";
pub const MAX_ANSWER_COLUMNS: usize = 6;

pub const STUDENT_COLUMNS: [&str; 6] = [
    "student_id",
    "full_name",
    "passport_series",
    "course",
    "group",
    "direction",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestion {
    pub row: usize,
    pub text: String,
    pub answers: Vec<ParsedAnswer>,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionSheet {
    pub questions: Vec<ParsedQuestion>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    pub row: usize,
    pub student_id: String,
    pub full_name: String,
    pub passport_series: String,
    pub course: String,
    pub group: String,
    pub direction: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentSheet {
    pub students: Vec<StudentRow>,
    pub warnings: Vec<String>,
}

fn answer_text_column(n: usize) -> String {
    format!("Answer {} Text", n)
}

fn answer_correct_column(n: usize) -> String {
    format!("Answer {} Correct", n)
}

/// Data rows paired with their 1-based spreadsheet row number.
fn data_rows<'a>(range: &'a Range<Data>) -> impl Iterator<Item = (usize, &'a [Data])> + 'a {
    let first = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    range
        .rows()
        .enumerate()
        .skip(1)
        .map(move |(idx, row)| (first + idx + 1, row))
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|cell| match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

/// Rows without question text are skipped with a warning, including every row
/// of a sheet that has no `Question Text` column at all. Any question type
/// column is ignored; imported questions are always MCQ.
pub fn parse_question_sheet(range: &Range<Data>) -> QuestionSheet {
    let header = Header::from_range(range);
    let mut sheet = QuestionSheet::default();
    for (row_number, row) in data_rows(range) {
        if is_blank_row(row) {
            continue;
        }
        let text = header.text(row, QUESTION_TEXT_COLUMN);
        if text.is_empty() {
            sheet
                .warnings
                .push(format!("Row {}: missing question text, skipped", row_number));
            continue;
        }

        let answers = (1..=MAX_ANSWER_COLUMNS)
            .filter_map(|n| {
                let text = header.text(row, &answer_text_column(n));
                if text.is_empty() {
                    return None;
                }
                let is_correct = header
                    .cell(row, &answer_correct_column(n))
                    .map(cell_flag)
                    .unwrap_or(false);
                Some(ParsedAnswer { text, is_correct })
            })
            .collect::<Vec<_>>();
        if answers.is_empty() {
            sheet
                .warnings
                .push(format!("Row {}: question has no answers", row_number));
        }

        sheet.questions.push(ParsedQuestion {
            row: row_number,
            text,
            answers,
        });
    }
    sheet
}

pub fn parse_student_sheet(range: &Range<Data>) -> Result<StudentSheet> {
    let header = Header::from_range(range);
    let missing = header.missing(&STUDENT_COLUMNS);
    if !missing.is_empty() {
        return Err(Error::MissingColumns(
            missing.into_iter().map(String::from).collect(),
        ));
    }

    let mut sheet = StudentSheet::default();
    for (row_number, row) in data_rows(range) {
        if is_blank_row(row) {
            continue;
        }
        let student = StudentRow {
            row: row_number,
            student_id: header.text(row, "student_id"),
            full_name: header.text(row, "full_name"),
            passport_series: header.text(row, "passport_series"),
            course: header.text(row, "course"),
            group: header.text(row, "group"),
            direction: header.text(row, "direction"),
        };
        if student.student_id.is_empty() {
            sheet
                .warnings
                .push(format!("Row {}: missing student_id, skipped", row_number));
            continue;
        }
        if student.passport_series.is_empty() {
            sheet.warnings.push(format!(
                "Row {}: student {} has no passport_series, skipped",
                row_number, student.student_id
            ));
            continue;
        }
        sheet.students.push(student);
    }
    Ok(sheet)
}

#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
}

impl ImportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the test, then its questions row by row. If writing fails before
    /// any question landed, the empty test is removed again.
    pub async fn import_test(
        &self,
        identity: &Identity,
        form: ImportTestForm,
        filename: &str,
        bytes: &[u8],
    ) -> Result<ImportTestSummary> {
        identity.require(AUTHOR_ROLES)?;

        let mut conn = self.pool.acquire().await?;
        ensure_subject_exists(&mut conn, form.subject_id).await?;
        ensure_spreadsheet_extension(filename)?;
        let sheet = parse_question_sheet(&open_first_sheet(bytes)?);

        let test = insert_test(
            &mut conn,
            identity.account_id,
            form.subject_id,
            form.name.trim(),
            form.duration_minutes,
            form.status,
        )
        .await?;

        let mut summary = ImportTestSummary {
            test_id: test.id,
            questions_imported: 0,
            answers_imported: 0,
            warnings: sheet.warnings,
        };
        for warning in &summary.warnings {
            tracing::warn!(test_id = %test.id, "{}", warning);
        }

        if let Err(e) =
            write_questions(&mut conn, test.id, form.default_points, sheet.questions, &mut summary)
                .await
        {
            if summary.questions_imported == 0 {
                tracing::warn!(test_id = %test.id, error = %e, "Import failed; removing empty test");
                if let Err(cleanup) = sqlx::query("DELETE FROM tests WHERE id = $1")
                    .bind(test.id)
                    .execute(&mut *conn)
                    .await
                {
                    tracing::error!(test_id = %test.id, error = %cleanup, "Failed to remove empty test");
                }
            } else {
                tracing::error!(
                    test_id = %test.id,
                    imported = summary.questions_imported,
                    error = %e,
                    "Import failed part way; keeping imported questions"
                );
            }
            return Err(e);
        }

        tracing::info!(
            test_id = %test.id,
            owner = %identity.account_id,
            questions = summary.questions_imported,
            answers = summary.answers_imported,
            warnings = summary.warnings.len(),
            "Test imported"
        );
        Ok(summary)
    }

    pub async fn import_students(
        &self,
        identity: &Identity,
        filename: &str,
        bytes: &[u8],
    ) -> Result<StudentImportSummary> {
        identity.require(&[Role::Admin])?;
        ensure_spreadsheet_extension(filename)?;
        let sheet = parse_student_sheet(&open_first_sheet(bytes)?)?;

        let mut summary = StudentImportSummary {
            created: 0,
            skipped: sheet.warnings.len(),
            warnings: sheet.warnings,
        };

        // Passport series doubles as the initial password.
        let passports = sheet
            .students
            .iter()
            .map(|s| s.passport_series.clone())
            .collect();
        let hashes = hash_passports(passports).await?;

        for (student, password_hash) in sheet.students.into_iter().zip(hashes) {
            let created: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO accounts
                    (username, password_hash, role, external_id, full_name, student_group, course, direction)
                VALUES ($1, $2, $3, $1, $4, $5, $6, $7)
                ON CONFLICT DO NOTHING
                RETURNING id
                "#,
            )
            .bind(&student.student_id)
            .bind(password_hash)
            .bind(Role::Student.as_str())
            .bind(&student.full_name)
            .bind(&student.group)
            .bind(&student.course)
            .bind(&student.direction)
            .fetch_optional(&self.pool)
            .await?;

            match created {
                Some(_) => summary.created += 1,
                None => {
                    let warning = format!(
                        "Row {}: student {} already exists, skipped",
                        student.row, student.student_id
                    );
                    tracing::warn!("{}", warning);
                    summary.warnings.push(warning);
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            created = summary.created,
            skipped = summary.skipped,
            by = %identity.account_id,
            "Students imported"
        );
        Ok(summary)
    }

    /// Downloadable template for test imports, with two example questions.
    pub fn test_import_sample() -> Result<Vec<u8>> {
        let mut columns = vec![
            QUESTION_TEXT_COLUMN.to_string(),
            QUESTION_TYPE_COLUMN.to_string(),
        ];
        for n in 1..=MAX_ANSWER_COLUMNS {
            columns.push(answer_text_column(n));
            columns.push(answer_correct_column(n));
        }
        let rows: [&[&str]; 2] = [
            &[
                "What is the capital of France?",
                "MCQ",
                "Paris",
                "TRUE",
                "London",
                "FALSE",
                "Berlin",
                "FALSE",
                "Madrid",
                "FALSE",
            ],
            &["2 + 2 = ?", "MCQ", "3", "FALSE", "4", "TRUE"],
        ];
        sample_workbook("Questions", &columns, &rows)
    }

    pub fn student_import_sample() -> Result<Vec<u8>> {
        let columns: Vec<String> = STUDENT_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows: [&[&str]; 1] = [&[
            "20231045",
            "Aziz Karimov",
            "AB1234567",
            "2",
            "CS-21",
            "Computer Science",
        ]];
        sample_workbook("Students", &columns, &rows)
    }
}

async fn write_questions(
    conn: &mut PgConnection,
    test_id: Uuid,
    points: i32,
    questions: Vec<ParsedQuestion>,
    summary: &mut ImportTestSummary,
) -> Result<()> {
    for (position, question) in questions.into_iter().enumerate() {
        let question_id =
            insert_question(conn, test_id, &question.text, points, position as i32).await?;
        summary.questions_imported += 1;
        for (answer_position, answer) in question.answers.iter().enumerate() {
            insert_answer(
                conn,
                question_id,
                &answer.text,
                answer.is_correct,
                answer_position as i32,
            )
            .await?;
            summary.answers_imported += 1;
        }
    }
    Ok(())
}

/// Argon2 is CPU bound, so a whole roster is hashed off the async workers.
async fn hash_passports(passports: Vec<String>) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || {
        passports
            .iter()
            .map(|p| hash_password(p))
            .collect::<Result<Vec<_>>>()
    })
    .await
    .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
}

fn sample_workbook(sheet: &str, columns: &[String], rows: &[&[&str]]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet)?;

    let header_format = Format::new().set_bold();
    for (col, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
        worksheet.set_column_width(col as u16, 18.0)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            worksheet.write_string(idx as u32 + 1, col as u16, *value)?;
        }
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::verify_password;

    fn workbook_bytes(rows: &[Vec<&str>]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    worksheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn question_header() -> Vec<&'static str> {
        vec![
            "Question Text",
            "Question Type",
            "Answer 1 Text",
            "Answer 1 Correct",
            "Answer 2 Text",
            "Answer 2 Correct",
        ]
    }

    #[test]
    fn row_without_question_text_is_skipped_with_warning() {
        let bytes = workbook_bytes(&[
            question_header(),
            vec!["Capital of France?", "MCQ", "Paris", "TRUE", "Rome", "FALSE"],
            vec!["", "MCQ", "Yes", "TRUE", "No", "FALSE"],
            vec!["2 + 2 = ?", "Essay", "4", "yes", "5", "no"],
        ]);

        let sheet = parse_question_sheet(&open_first_sheet(&bytes).unwrap());

        assert_eq!(sheet.questions.len(), 2);
        assert_eq!(sheet.questions[0].row, 2);
        assert_eq!(sheet.questions[1].row, 4);
        assert_eq!(sheet.warnings.len(), 1);
        assert!(sheet.warnings[0].starts_with("Row 3"));
        assert_eq!(
            sheet.questions[1].answers,
            vec![
                ParsedAnswer { text: "4".into(), is_correct: true },
                ParsedAnswer { text: "5".into(), is_correct: false },
            ]
        );
    }

    #[test]
    fn reads_up_to_six_answer_pairs() {
        let mut header = vec!["Question Text"];
        let mut row = vec!["Pick one"];
        let names: Vec<(String, String)> = (1..=7)
            .map(|n| (answer_text_column(n), answer_correct_column(n)))
            .collect();
        for (text, correct) in &names {
            header.push(text);
            header.push(correct);
        }
        let values: Vec<String> = (1..=7).map(|n| format!("Option {}", n)).collect();
        for value in &values {
            row.push(value);
            row.push("FALSE");
        }

        let bytes = workbook_bytes(&[header, row]);
        let sheet = parse_question_sheet(&open_first_sheet(&bytes).unwrap());

        assert_eq!(sheet.questions[0].answers.len(), MAX_ANSWER_COLUMNS);
    }

    #[test]
    fn sheet_without_text_column_warns_on_every_row() {
        let bytes = workbook_bytes(&[
            vec!["Question", "Answer 1 Text"],
            vec!["Hi", "Hello"],
            vec!["Bye", "Goodbye"],
        ]);
        let sheet = parse_question_sheet(&open_first_sheet(&bytes).unwrap());
        assert!(sheet.questions.is_empty());
        assert_eq!(
            sheet.warnings,
            vec![
                "Row 2: missing question text, skipped".to_string(),
                "Row 3: missing question text, skipped".to_string(),
            ]
        );
    }

    #[test]
    fn student_sheet_requires_every_column() {
        let bytes = workbook_bytes(&[
            vec!["student_id", "full_name", "passport_series", "course"],
            vec!["1", "A", "AB1", "2"],
        ]);
        let err = parse_student_sheet(&open_first_sheet(&bytes).unwrap()).unwrap_err();
        match err {
            Error::MissingColumns(cols) => assert_eq!(cols, vec!["group", "direction"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn student_rows_without_passport_are_skipped() {
        let bytes = workbook_bytes(&[
            STUDENT_COLUMNS.to_vec(),
            vec!["20231045", "Aziz Karimov", "AB1234567", "2", "CS-21", "CS"],
            vec!["20231046", "Dilnoza Rahimova", "", "2", "CS-21", "CS"],
        ]);

        let sheet = parse_student_sheet(&open_first_sheet(&bytes).unwrap()).unwrap();

        assert_eq!(sheet.students.len(), 1);
        assert_eq!(sheet.students[0].student_id, "20231045");
        assert_eq!(sheet.students[0].group, "CS-21");
        assert_eq!(sheet.warnings.len(), 1);
        assert!(sheet.warnings[0].contains("20231046"));
    }

    #[tokio::test]
    async fn passports_hash_in_row_order() {
        let hashes = hash_passports(vec!["AB1234567".into(), "AC7654321".into()])
            .await
            .unwrap();
        assert_eq!(hashes.len(), 2);
        assert!(verify_password("AB1234567", &hashes[0]));
        assert!(verify_password("AC7654321", &hashes[1]));
        assert!(!verify_password("AB1234567", &hashes[1]));
    }

    #[test]
    fn sample_files_parse_cleanly() {
        let tests = ImportService::test_import_sample().unwrap();
        let sheet = parse_question_sheet(&open_first_sheet(&tests).unwrap());
        assert_eq!(sheet.questions.len(), 2);
        assert!(sheet.warnings.is_empty());
        assert!(sheet.questions[0].answers[0].is_correct);
        assert!(sheet.questions[1].answers[1].is_correct);

        let students = ImportService::student_import_sample().unwrap();
        let sheet = parse_student_sheet(&open_first_sheet(&students).unwrap()).unwrap();
        assert_eq!(sheet.students.len(), 1);
    }
}
