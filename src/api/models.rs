use crate::api::{ModelInfo, TagsResponse};
use crate::core::backend::{format_api_error, BackendError};
use crate::utils::url::construct_api_url;

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<TagsResponse, BackendError> {
    let tags_url = construct_api_url(base_url, "api/tags");
    let response = client
        .get(tags_url)
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(BackendError::from_reqwest)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: format_api_error(&error_text),
        });
    }

    response
        .json::<TagsResponse>()
        .await
        .map_err(BackendError::from_reqwest)
}

/// Newest first by `modified_at`, then by name. Entries without a timestamp
/// sort last.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| match (&a.modified_at, &b.modified_at) {
        (Some(a_modified), Some(b_modified)) => b_modified
            .cmp(a_modified)
            .then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}

/// Human-readable size in the units `ollama list` prints.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1000.0 {
            break;
        }
        value /= 1000.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}
