use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    recipes::{repo::RecipeRepo, repo_types::Recipe},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl UploadFormat {
    pub fn ext(self) -> &'static str {
        match self {
            UploadFormat::Jpeg => "jpg",
            UploadFormat::Png => "png",
            UploadFormat::Gif => "gif",
            UploadFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            UploadFormat::Jpeg => "image/jpeg",
            UploadFormat::Png => "image/png",
            UploadFormat::Gif => "image/gif",
            UploadFormat::Webp => "image/webp",
        }
    }
}

const NOT_AN_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Format of an uploaded image, or `None` unless the bytes fully decode as a
/// supported image. The declared content type plays no part.
pub fn decode_image(body: &[u8]) -> Option<UploadFormat> {
    let guessed = image::guess_format(body).ok()?;
    let format = match guessed {
        image::ImageFormat::Jpeg => UploadFormat::Jpeg,
        image::ImageFormat::Png => UploadFormat::Png,
        image::ImageFormat::Gif => UploadFormat::Gif,
        image::ImageFormat::WebP => UploadFormat::Webp,
        _ => return None,
    };
    match image::load_from_memory_with_format(body, guessed) {
        Ok(_) => Some(format),
        Err(e) => {
            debug!(error = %e, ?format, "upload failed to decode");
            None
        }
    }
}

/// Blob key for a new recipe image.
pub fn recipe_image_key(format: UploadFormat) -> String {
    format!("uploads/recipe/{}.{}", Uuid::new_v4(), format.ext())
}

/// Store `body` as the image of an owned recipe, replacing any previous one.
///
/// Nothing is written unless the recipe exists for `owner` and `body` decodes
/// as an image. The previous blob is removed only after the new reference is
/// persisted.
pub async fn replace_recipe_image(
    st: &AppState,
    owner: i64,
    recipe_id: i64,
    body: Bytes,
) -> ApiResult<Recipe> {
    st.store
        .find_recipe(owner, recipe_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let data = body.clone();
    let format = tokio::task::spawn_blocking(move || decode_image(&data))
        .await
        .context("image decode task")?
        .ok_or_else(|| ApiError::bad_request(NOT_AN_IMAGE))?;

    let key = recipe_image_key(format);
    st.storage
        .put_object(&key, body, format.mime())
        .await
        .with_context(|| format!("put_object {}", key))?;

    let Some((updated, previous)) = st.store.swap_recipe_image(owner, recipe_id, &key).await? else {
        // recipe deleted between lookup and update
        discard_blob(st, &key).await;
        return Err(ApiError::not_found("Recipe not found"));
    };

    if let Some(previous) = previous.as_deref().filter(|p| *p != key) {
        discard_blob(st, previous).await;
    }

    info!(recipe_id, owner, %key, "recipe image stored");
    Ok(updated)
}

/// Best-effort blob removal; failures are logged.
pub async fn discard_blob(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete blob");
    }
}
