//! Message template commands shared by the template and admin routes.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::template::{MessageTemplateRow, TemplateDraft};
use crate::store::ReviewStore;

pub const DEFAULT_TEMPLATE_NAME: &str = "Default Template";

/// Body seeded when the admin view finds no template at all.
pub const DEFAULT_TEMPLATE_BODY: &str = "Thank you {customerName} for choosing us!\n\
Would you please rate my service for you today?\n\
{googleReviewLink}\n\nThank you,\n{technicianName}";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    pub name: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub is_default: Option<bool>,
}

/// Trims the input and checks the required fields.
pub fn draft_from_input(input: TemplateInput) -> Result<TemplateDraft, AppError> {
    let name = input.name.as_deref().map(str::trim).unwrap_or_default();
    let content = input.content.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || content.is_empty() {
        return Err(AppError::Validation(
            "Template name and content are required".to_string(),
        ));
    }

    Ok(TemplateDraft {
        name: name.to_string(),
        template: content.to_string(),
        description: input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        is_default: input.is_default.unwrap_or(false),
    })
}

pub async fn create_template(
    store: &dyn ReviewStore,
    input: TemplateInput,
) -> Result<MessageTemplateRow, AppError> {
    let draft = draft_from_input(input)?;
    if store.template_name_taken(&draft.name, None).await? {
        return Err(AppError::Validation(
            "A template with this name already exists".to_string(),
        ));
    }
    let row = store.insert_template(draft).await?;
    info!("Created template {} ({})", row.name, row.id);
    Ok(row)
}

pub async fn update_template(
    store: &dyn ReviewStore,
    id: Uuid,
    input: TemplateInput,
) -> Result<MessageTemplateRow, AppError> {
    let draft = draft_from_input(input)?;
    if store.find_template(id).await?.is_none() {
        return Err(template_not_found());
    }
    if store.template_name_taken(&draft.name, Some(id)).await? {
        return Err(AppError::Validation(
            "A template with this name already exists".to_string(),
        ));
    }
    let row = store
        .update_template(id, draft)
        .await?
        .ok_or_else(template_not_found)?;
    info!("Updated template {} ({})", row.name, row.id);
    Ok(row)
}

/// Makes `id` the single default template.
pub async fn set_default_template(
    store: &dyn ReviewStore,
    id: Uuid,
) -> Result<MessageTemplateRow, AppError> {
    store
        .set_default_template(id)
        .await?
        .ok_or_else(template_not_found)
}

pub async fn delete_template(store: &dyn ReviewStore, id: Uuid) -> Result<(), AppError> {
    if !store.deactivate_template(id).await? {
        return Err(template_not_found());
    }
    info!("Soft deleted template {id}");
    Ok(())
}

/// The template the admin screen edits: the default, else the oldest active one, else a
/// freshly created default.
pub async fn admin_template(store: &dyn ReviewStore) -> Result<MessageTemplateRow, AppError> {
    if let Some(template) = store.find_default_template().await? {
        return Ok(template);
    }
    if let Some(template) = store.first_active_template().await? {
        return Ok(template);
    }

    info!("No message template found, creating default template");
    Ok(store
        .insert_template(TemplateDraft {
            name: DEFAULT_TEMPLATE_NAME.to_string(),
            template: DEFAULT_TEMPLATE_BODY.to_string(),
            description: None,
            is_default: true,
        })
        .await?)
}

/// Replaces the body of the default template, creating one if none exists.
pub async fn update_admin_template(
    store: &dyn ReviewStore,
    body: Option<String>,
) -> Result<MessageTemplateRow, AppError> {
    let body = body
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::Validation("Template content is required".to_string()))?;

    match store.find_default_template().await? {
        Some(existing) => {
            let draft = TemplateDraft {
                name: existing.name,
                template: body,
                description: existing.description,
                is_default: true,
            };
            store
                .update_template(existing.id, draft)
                .await?
                .ok_or_else(template_not_found)
        }
        None => Ok(store
            .insert_template(TemplateDraft {
                name: DEFAULT_TEMPLATE_NAME.to_string(),
                template: body,
                description: None,
                is_default: true,
            })
            .await?),
    }
}

fn template_not_found() -> AppError {
    AppError::NotFound("SMS template not found".to_string())
}
