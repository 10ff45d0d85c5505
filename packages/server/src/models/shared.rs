use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, FieldError};

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Maximum length of a description field.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Check a trimmed display name (1-255 Unicode characters).
pub fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 255 {
        errors.push(FieldError {
            field: "name",
            message: "Name must be 1-255 characters".into(),
        });
    }
}

/// Check an optional description field.
pub fn check_description(description: Option<&str>, errors: &mut Vec<FieldError>) {
    if let Some(desc) = description
        && desc.chars().count() > MAX_DESCRIPTION_LENGTH
    {
        errors.push(FieldError {
            field: "description",
            message: format!("Description must be at most {MAX_DESCRIPTION_LENGTH} characters"),
        });
    }
}

/// Turn accumulated field errors into a validation failure.
pub fn finish_validation(errors: Vec<FieldError>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Invalid(errors))
    }
}

/// Parse a comma-separated id-set query parameter (e.g. `category_ids=1,2`).
pub fn parse_id_set(raw: &str, field: &'static str) -> Result<Vec<i32>, AppError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id: i32 = part.parse().map_err(|_| {
            AppError::Validation(format!("{field} must be a comma-separated list of ids"))
        })?;
        ids.push(id);
    }
    Ok(ids)
}
