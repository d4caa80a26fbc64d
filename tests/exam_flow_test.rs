//! End-to-end flows against PostgreSQL. Run with a reachable `DATABASE_URL`:
//! `cargo test -- --ignored`.

use std::collections::HashMap;
use std::env;

use exam_backend::{
    config::init_config,
    database::pool::{create_pool, run_migrations},
    dto::account_dto::CreateAccountPayload,
    dto::authoring_dto::{
        CreateQuestionForm, CreateSubjectPayload, CreateTestPayload, EditAnswerForm,
        EditQuestionForm, EditTestPayload, ImportTestForm,
    },
    dto::results_dto::ExportFormat,
    error::Error,
    identity::Identity,
    models::{account::Role, test::TestStatus},
    services::export_service::ExportService,
    AppState,
};
use rust_xlsxwriter::Workbook;
use uuid::Uuid;

async fn state() -> AppState {
    dotenvy::dotenv().ok();
    env::set_var("JWT_SECRET", "test_secret_key");
    let _ = init_config();
    let pool = create_pool().await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    AppState::new(pool)
}

async fn account(state: &AppState, role: Role, name: &str) -> Identity {
    let admin = Identity::new(Uuid::new_v4(), Role::Admin);
    let username = format!("{}-{}", name, Uuid::new_v4());
    let created = state
        .account_service
        .create_account(
            &admin,
            CreateAccountPayload {
                username: username.clone(),
                password: "secret-password".into(),
                role,
                external_id: None,
                full_name: Some(name.into()),
                student_group: None,
                course: None,
                direction: None,
            },
        )
        .await
        .expect("create account");
    Identity::new(created.id, role)
}

#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn quiz_submission_scores_out_of_twenty_five_and_retake_reopens_it() {
    let state = state().await;
    let teacher = account(&state, Role::Teacher, "Teacher").await;
    let student = account(&state, Role::Student, "Student").await;
    let admin = Identity::new(Uuid::new_v4(), Role::Admin);

    let subject = state
        .subject_service
        .create_subject(
            &teacher,
            CreateSubjectPayload {
                name: "Math".into(),
                description: "Arithmetic".into(),
            },
        )
        .await
        .unwrap();

    let test = state
        .test_service
        .create_test(
            &teacher,
            CreateTestPayload {
                subject_id: subject.id,
                name: "Quiz1".into(),
                duration_minutes: 10,
                status: TestStatus::Published,
                default_points: 1,
                questions: vec![
                    CreateQuestionForm {
                        text: "1 + 1 = ?".into(),
                        answers: vec!["2".into(), "3".into()],
                        correct_answers: vec![0],
                    },
                    CreateQuestionForm {
                        text: "2 + 2 = ?".into(),
                        answers: vec!["5".into(), "4".into()],
                        correct_answers: vec![1],
                    },
                ],
            },
        )
        .await
        .unwrap();
    assert_eq!(test.questions.len(), 2);

    let sheet = state
        .attempt_service
        .start_attempt(&student, test.test.id)
        .await
        .unwrap();
    assert_eq!(sheet.questions.len(), 2);
    assert_eq!(sheet.total_score, 25);

    // first question right, second wrong
    let mut answers = HashMap::new();
    let q1 = &test.questions[0];
    let q2 = &test.questions[1];
    answers.insert(q1.question.id, q1.answers.iter().find(|a| a.is_correct).unwrap().id);
    answers.insert(q2.question.id, q2.answers.iter().find(|a| !a.is_correct).unwrap().id);

    let submitted = state
        .attempt_service
        .submit_attempt(&student, test.test.id, &answers, 120)
        .await
        .unwrap();
    assert_eq!(submitted.score_achieved, 1);
    assert_eq!(submitted.total_score, 25);

    let blocked = state
        .attempt_service
        .start_attempt(&student, test.test.id)
        .await;
    assert!(matches!(blocked, Err(Error::AlreadyCompleted)));

    let first = state
        .result_service
        .initiate_retake(&admin, submitted.result_id)
        .await
        .unwrap();
    let second = state
        .result_service
        .initiate_retake(&admin, submitted.result_id)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert!(first.is_pending());

    let (pending, completed): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FILTER (WHERE status = 'Pending'),
               COUNT(*) FILTER (WHERE status = 'Completed')
        FROM results WHERE student_id = $1 AND test_id = $2
        "#,
    )
    .bind(student.account_id)
    .bind(test.test.id)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!((pending, completed), (1, 1));

    state
        .attempt_service
        .start_attempt(&student, test.test.id)
        .await
        .expect("retake reopens the test");
    let retaken = state
        .attempt_service
        .submit_attempt(&student, test.test.id, &HashMap::new(), 30)
        .await
        .unwrap();
    assert_eq!(retaken.result_id, first.id);
    assert_eq!(retaken.score_achieved, 0);

    let listings = state.result_service.list_results(&teacher).await.unwrap();
    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|r| r.status == "Completed"));

    let csv = state
        .result_service
        .export_results(&teacher, ExportFormat::Csv)
        .await
        .unwrap();
    let xlsx = state
        .result_service
        .export_results(&teacher, ExportFormat::Xlsx)
        .await
        .unwrap();
    assert_eq!(
        ExportService::rows_from_csv(&csv).unwrap(),
        ExportService::rows_from_xlsx(&xlsx).unwrap()
    );

    state
        .test_service
        .delete_test(&teacher, test.test.id, true)
        .await
        .unwrap();
    assert!(state.result_service.list_results(&teacher).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn import_skips_rows_without_question_text() {
    let state = state().await;
    let teacher = account(&state, Role::Teacher, "Importer").await;
    let subject = state
        .subject_service
        .create_subject(
            &teacher,
            CreateSubjectPayload {
                name: "Geography".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let rows = [
        ["Question Text", "Answer 1 Text", "Answer 1 Correct", "Answer 2 Text", "Answer 2 Correct"],
        ["Capital of France?", "Paris", "TRUE", "Rome", "FALSE"],
        ["", "Yes", "TRUE", "No", "FALSE"],
        ["Capital of Italy?", "Paris", "FALSE", "Rome", "TRUE"],
    ];
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    let bytes = workbook.save_to_buffer().unwrap();

    let form = ImportTestForm {
        subject_id: subject.id,
        name: "Capitals".into(),
        duration_minutes: 5,
        default_points: 1,
        status: TestStatus::Draft,
    };
    let summary = state
        .import_service
        .import_test(&teacher, form.clone(), "capitals.xlsx", &bytes)
        .await
        .unwrap();
    assert_eq!(summary.questions_imported, 2);
    assert_eq!(summary.answers_imported, 4);
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.warnings[0].starts_with("Row 3"));

    let detail = state
        .test_service
        .get_test(&teacher, summary.test_id)
        .await
        .unwrap();
    assert!(detail.questions.iter().all(|q| q.question.question_type == "MCQ"));

    let wrong_type = state
        .import_service
        .import_test(&teacher, form.clone(), "capitals.csv", &bytes)
        .await;
    assert!(matches!(wrong_type, Err(Error::InvalidFileType(_))));

    let missing_subject = state
        .import_service
        .import_test(
            &teacher,
            ImportTestForm {
                subject_id: Uuid::new_v4(),
                ..form
            },
            "capitals.xlsx",
            &bytes,
        )
        .await;
    assert!(matches!(missing_subject, Err(Error::SubjectNotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn editing_reconciles_questions_and_answers_by_id() {
    let state = state().await;
    let teacher = account(&state, Role::Teacher, "Editor").await;
    let subject = state
        .subject_service
        .create_subject(
            &teacher,
            CreateSubjectPayload {
                name: "Math".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let question = |text: &str, answers: [&str; 2]| CreateQuestionForm {
        text: text.into(),
        answers: answers.iter().map(|a| a.to_string()).collect(),
        correct_answers: vec![0],
    };
    let created = state
        .test_service
        .create_test(
            &teacher,
            CreateTestPayload {
                subject_id: subject.id,
                name: "Quiz2".into(),
                duration_minutes: 10,
                status: TestStatus::Draft,
                default_points: 1,
                questions: vec![
                    question("1 + 1 = ?", ["2", "3"]),
                    question("2 + 2 = ?", ["4", "5"]),
                    question("3 + 3 = ?", ["6", "7"]),
                ],
            },
        )
        .await
        .unwrap();
    let kept = &created.questions[0];
    let blanked = &created.questions[1];
    let dropped = &created.questions[2];

    let edited = state
        .test_service
        .edit_test(
            &teacher,
            created.test.id,
            EditTestPayload {
                name: "Quiz2 revised".into(),
                duration_minutes: 15,
                status: Some(TestStatus::Published),
                subject_id: None,
                default_points: 2,
                questions: vec![
                    EditQuestionForm {
                        id: Some(kept.question.id),
                        text: "What is 1 + 1?".into(),
                        points: None,
                        answers: vec![
                            EditAnswerForm {
                                id: Some(kept.answers[0].id),
                                text: "two".into(),
                                is_correct: true,
                            },
                            EditAnswerForm {
                                id: None,
                                text: "eleven".into(),
                                is_correct: false,
                            },
                        ],
                    },
                    EditQuestionForm {
                        id: Some(blanked.question.id),
                        text: "   ".into(),
                        points: None,
                        answers: vec![],
                    },
                    EditQuestionForm {
                        id: None,
                        text: "4 + 4 = ?".into(),
                        points: None,
                        answers: vec![EditAnswerForm {
                            id: None,
                            text: "8".into(),
                            is_correct: true,
                        }],
                    },
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.test.name, "Quiz2 revised");
    assert_eq!(edited.test.status, "Published");
    assert_eq!(edited.questions.len(), 2);

    let first = &edited.questions[0];
    assert_eq!(first.question.id, kept.question.id);
    assert_eq!(first.question.text, "What is 1 + 1?");
    assert_eq!(first.question.points, 1);
    assert_eq!(first.answers.len(), 2);
    assert_eq!(first.answers[0].id, kept.answers[0].id);
    assert_eq!(first.answers[0].text, "two");
    assert!(first.answers[0].is_correct);
    assert_ne!(first.answers[1].id, kept.answers[1].id);
    assert_eq!(first.answers[1].text, "eleven");

    let second = &edited.questions[1];
    assert!(![kept, blanked, dropped]
        .iter()
        .any(|q| q.question.id == second.question.id));
    assert_eq!(second.question.text, "4 + 4 = ?");
    assert_eq!(second.question.points, 2);
    assert_eq!(second.question.question_type, "MCQ");
    assert_eq!(second.answers.len(), 1);

    let leftovers: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM questions WHERE id = ANY($1)",
    )
    .bind(vec![blanked.question.id, dropped.question.id])
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(leftovers, 0);

    let stale_answer: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers WHERE id = $1")
        .bind(kept.answers[1].id)
        .fetch_one(&state.pool)
        .await
        .unwrap();
    assert_eq!(stale_answer, 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn deleting_a_result_lets_the_student_start_again() {
    let state = state().await;
    let teacher = account(&state, Role::Teacher, "Owner").await;
    let student = account(&state, Role::Student, "Taker").await;
    let admin = Identity::new(Uuid::new_v4(), Role::Admin);

    let subject = state
        .subject_service
        .create_subject(
            &teacher,
            CreateSubjectPayload {
                name: "History".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    let test = state
        .test_service
        .create_test(
            &teacher,
            CreateTestPayload {
                subject_id: subject.id,
                name: "Dates".into(),
                duration_minutes: 5,
                status: TestStatus::Published,
                default_points: 1,
                questions: vec![CreateQuestionForm {
                    text: "Year of the moon landing?".into(),
                    answers: vec!["1969".into(), "1972".into()],
                    correct_answers: vec![0],
                }],
            },
        )
        .await
        .unwrap();

    let submitted = state
        .attempt_service
        .submit_attempt(&student, test.test.id, &HashMap::new(), 40)
        .await
        .unwrap();
    assert!(matches!(
        state.attempt_service.start_attempt(&student, test.test.id).await,
        Err(Error::AlreadyCompleted)
    ));

    state
        .result_service
        .delete_result(&admin, submitted.result_id)
        .await
        .unwrap();

    let sheet = state
        .attempt_service
        .start_attempt(&student, test.test.id)
        .await
        .expect("a deleted result makes the student a first-time taker");
    assert_eq!(sheet.questions.len(), 1);

    let again = state
        .result_service
        .delete_result(&admin, submitted.result_id)
        .await;
    assert!(matches!(again, Err(Error::NotFound(_))));

    state
        .test_service
        .delete_test(&teacher, test.test.id, true)
        .await
        .unwrap();
}
