use std::fmt;

use serde::{Serialize, Serializer};

use aclsync_error::{DirectoryError, ErrorExt, Operation, StatusCode};

use crate::account::Secret;

/// Серьёзность диагностики.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Сообщение для пользователя, относящееся к одной учётной записи.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(serialize_with = "serialize_operation")]
    pub operation: Operation,
    pub summary: String,
    pub detail: String,
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Diagnostic {
    /// Фатальная диагностика из ошибки каталога.
    ///
    /// Текст хранилища сохраняется как есть, но пароль, если он в нём
    /// встретился, заменяется на `***`.
    pub fn from_error(
        operation: Operation,
        err: &DirectoryError,
        password: Option<&Secret>,
    ) -> Self {
        let detail = format!("{}{}", detail_prefix(operation), err);
        Self {
            severity: Severity::Error,
            operation,
            summary: summary(operation).to_string(),
            detail: scrub(detail, password),
            status: err.status_code(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

fn summary(operation: Operation) -> &'static str {
    match operation {
        Operation::Create => "Unable to create user",
        Operation::Read => "Unable to read user",
        Operation::Update => "Unable to update user",
        Operation::Delete => "Unable to delete user",
        Operation::Import => "Unable to import user",
    }
}

fn detail_prefix(operation: Operation) -> &'static str {
    match operation {
        Operation::Create => "create redis user fail: ",
        Operation::Read => "Read redis user fail: ",
        Operation::Update => "Update redis user fail: ",
        Operation::Delete => "Delete redis user fail: ",
        Operation::Import => "Import redis user fail: ",
    }
}

/// Более короткий пароль заменяется только в токене `>password`.
const MIN_BARE_SCRUB_LEN: usize = 6;

fn scrub(
    detail: String,
    password: Option<&Secret>,
) -> String {
    let Some(pw) = password.filter(|pw| !pw.is_empty()) else {
        return detail;
    };
    let detail = detail.replace(&format!(">{}", pw.expose()), ">***");
    if pw.expose().chars().count() >= MIN_BARE_SCRUB_LEN {
        detail.replace(pw.expose(), "***")
    } else {
        detail
    }
}

fn serialize_operation<S: Serializer>(
    operation: &Operation,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(operation.as_str())
}

fn serialize_status<S: Serializer>(
    status: &StatusCode,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u32(status.code())
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for Severity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.summary, self.detail)
    }
}

impl std::error::Error for Diagnostic {}
