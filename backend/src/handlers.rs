use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::{Form, Json};
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use tracing::info;
use transfer::config::TransferConfig;
use transfer::{run_style_transfer, ProgressSample};
use uuid::Uuid;

use crate::error::{BackendError, Result};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub content_id: String,
    pub style_id: String,
    pub message: &'static str,
}

pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut content = None;
    let mut style = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content_image" => content = Some(field.bytes().await?),
            "style_image" => style = Some(field.bytes().await?),
            _ => {}
        }
    }

    let content = content
        .ok_or_else(|| BackendError::BadRequest("missing field 'content_image'".to_string()))?;
    let style = style
        .ok_or_else(|| BackendError::BadRequest("missing field 'style_image'".to_string()))?;

    let content_id = Uuid::new_v4().to_string();
    let style_id = Uuid::new_v4().to_string();
    tokio::fs::write(state.upload_path(&content_id), &content).await?;
    tokio::fs::write(state.upload_path(&style_id), &style).await?;

    info!("Stored uploads {content_id} and {style_id}");
    Ok(Json(UploadResponse {
        content_id,
        style_id,
        message: "Images uploaded successfully",
    }))
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub content_id: String,
    pub style_id: String,
    pub content_weight: Option<f32>,
    pub style_weight: Option<f32>,
    pub steps: Option<u32>,
    pub learning_rate: Option<f64>,
    pub conv1_1_weight: Option<f32>,
    pub conv2_1_weight: Option<f32>,
    pub conv3_1_weight: Option<f32>,
    pub conv4_1_weight: Option<f32>,
    pub conv5_1_weight: Option<f32>,
}

impl TransferRequest {
    fn to_config(&self) -> TransferConfig {
        let mut config = TransferConfig::new();
        if let Some(v) = self.content_weight {
            config = config.with_content_weight(v);
        }
        if let Some(v) = self.style_weight {
            config = config.with_style_weight(v);
        }
        if let Some(v) = self.steps {
            config = config.with_steps(v);
        }
        if let Some(v) = self.learning_rate {
            config = config.with_learning_rate(v);
        }
        if let Some(v) = self.conv1_1_weight {
            config = config.with_conv1_1_weight(v);
        }
        if let Some(v) = self.conv2_1_weight {
            config = config.with_conv2_1_weight(v);
        }
        if let Some(v) = self.conv3_1_weight {
            config = config.with_conv3_1_weight(v);
        }
        if let Some(v) = self.conv4_1_weight {
            config = config.with_conv4_1_weight(v);
        }
        if let Some(v) = self.conv5_1_weight {
            config = config.with_conv5_1_weight(v);
        }
        config
    }
}

#[derive(Serialize)]
pub struct TransferResponse {
    pub result_id: String,
    pub preview: String,
    pub progress: Vec<ProgressSample>,
}

pub async fn transfer_style(
    State(state): State<AppState>,
    Form(request): Form<TransferRequest>,
) -> Result<Json<TransferResponse>> {
    let content_id = parse_id(&request.content_id)?;
    let style_id = parse_id(&request.style_id)?;

    let content = tokio::fs::read(state.upload_path(&content_id))
        .await
        .map_err(|_| BackendError::NotFound)?;
    let style = tokio::fs::read(state.upload_path(&style_id))
        .await
        .map_err(|_| BackendError::NotFound)?;

    let config = request.to_config();
    // Reject bad hyperparameters before taking the run slot.
    config.validate().map_err(BackendError::Transfer)?;

    let _slot = state
        .run_slot
        .acquire()
        .await
        .expect("Run semaphore is never closed.");

    let vgg = state.vgg.clone();
    let (result_bytes, progress) = tokio::task::spawn_blocking(move || {
        let device = Default::default();
        run_style_transfer(&vgg, &content, &style, &config, &device)
    })
    .await
    .map_err(|e| BackendError::Internal(e.into()))??;

    let result_id = Uuid::new_v4().to_string();
    tokio::fs::write(state.result_path(&result_id), &result_bytes).await?;
    info!(
        "Transfer {content_id} + {style_id} -> {result_id} ({} progress samples)",
        progress.len()
    );

    Ok(Json(TransferResponse {
        preview: format!("data:image/jpeg;base64,{}", BASE64.encode(&result_bytes)),
        result_id,
        progress,
    }))
}

pub async fn download_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<impl axum::response::IntoResponse> {
    let result_id = parse_id(&result_id)?;
    let bytes = tokio::fs::read(state.result_path(&result_id))
        .await
        .map_err(|_| BackendError::NotFound)?;

    let headers = [
        (header::CONTENT_TYPE, "image/jpeg".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"style_transfer_{result_id}.jpg\""),
        ),
    ];
    Ok((headers, bytes))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub device: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        device: "cpu",
    })
}

// Ids become file names; only accept well-formed UUIDs.
fn parse_id(raw: &str) -> Result<String> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| BackendError::NotFound)
}
