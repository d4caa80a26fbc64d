use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::authoring_dto::ImportTestForm,
    error::{Error, Result},
    identity::Identity,
    models::account::Role,
    services::import_service::ImportService,
    services::test_service::AUTHOR_ROLES,
    AppState,
};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// An uploaded spreadsheet plus the plain form fields sent alongside it.
struct Upload {
    filename: String,
    data: Bytes,
    fields: HashMap<String, String>,
}

impl Upload {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.field(name)
            .ok_or_else(|| Error::BadRequest(format!("Missing form field '{}'", name)))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        self.required(name)?
            .parse()
            .map_err(|_| Error::BadRequest(format!("Form field '{}' has an invalid value", name)))
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            file = Some((filename, data));
        } else {
            let value = field.text().await?;
            fields.insert(name, value);
        }
    }

    let (filename, data) =
        file.ok_or_else(|| Error::BadRequest("Missing file field 'file'".into()))?;
    Ok(Upload {
        filename,
        data,
        fields,
    })
}

fn import_form(upload: &Upload) -> Result<ImportTestForm> {
    let form = ImportTestForm {
        subject_id: upload.parsed::<Uuid>("subject_id")?,
        name: upload.required("name")?.to_string(),
        duration_minutes: upload.parsed("duration_minutes")?,
        default_points: match upload.field("default_points") {
            Some(_) => upload.parsed("default_points")?,
            None => 1,
        },
        status: match upload.field("status") {
            Some(status) => status.parse()?,
            None => Default::default(),
        },
    };
    form.validate()?;
    Ok(form)
}

fn sample_download(filename: &str, buffer: Vec<u8>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        buffer,
    )
}

/// Multipart fields: `file`, `subject_id`, `name`, `duration_minutes`,
/// optional `default_points` (1) and `status` (Draft).
#[utoipa::path(
    post,
    path = "/api/tests/import",
    responses(
        (status = 201, description = "Test imported; skipped rows listed as warnings"),
        (status = 400, description = "Invalid file type, missing columns or form fields"),
        (status = 404, description = "Subject not found")
    )
)]
#[axum::debug_handler]
pub async fn import_test(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    identity.require(AUTHOR_ROLES)?;
    let upload = read_upload(multipart).await?;
    let form = import_form(&upload)?;
    let summary = state
        .import_service
        .import_test(&identity, form, &upload.filename, &upload.data)
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

#[axum::debug_handler]
pub async fn import_students(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    identity.require(&[Role::Admin])?;
    let upload = read_upload(multipart).await?;
    let summary = state
        .import_service
        .import_students(&identity, &upload.filename, &upload.data)
        .await?;
    Ok(Json(summary))
}

#[axum::debug_handler]
pub async fn test_import_sample(identity: Identity) -> Result<impl IntoResponse> {
    identity.require(AUTHOR_ROLES)?;
    let buffer = ImportService::test_import_sample()?;
    Ok(sample_download("test_import_sample.xlsx", buffer))
}

#[axum::debug_handler]
pub async fn student_import_sample(identity: Identity) -> Result<impl IntoResponse> {
    identity.require(&[Role::Admin])?;
    let buffer = ImportService::student_import_sample()?;
    Ok(sample_download("student_import_sample.xlsx", buffer))
}
