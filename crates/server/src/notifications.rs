use api_types::notification::{Template, TemplateValidation};
use axum::Json;
use engine::NotificationTemplate;

/// Reports whether a notification template only uses known tags.
pub async fn validate(Json(payload): Json<Template>) -> Json<TemplateValidation> {
    match NotificationTemplate::validate(&payload.text) {
        Ok(_) => Json(TemplateValidation {
            valid: true,
            error: None,
        }),
        Err(err) => Json(TemplateValidation {
            valid: false,
            error: Some(err.to_string()),
        }),
    }
}
