use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::catalog::{PlayDetail, PlayFilter, PlayListItem};
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AdminUser, AuthUser};
use crate::AppState;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/plays", get(list_plays).post(create_play))
        .route("/plays/{id}", get(get_play))
        .route(
            "/plays/{id}/upload-image",
            post(upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

#[derive(Debug, Deserialize)]
struct PlayQuery {
    title: Option<String>,
    genres: Option<String>,
    actors: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreatePlayRequest {
    #[validate(length(min = 1, max = 100))]
    title: String,
    #[validate(length(min = 1))]
    description: String,
    #[serde(default)]
    genres: Vec<i64>,
    #[serde(default)]
    actors: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct PlayImageResponse {
    id: i64,
    image: Option<String>,
}

// "1,2,3" -> [1, 2, 3]
fn parse_ids(name: &str, raw: Option<&str>) -> Result<Option<Vec<i64>>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("{name} must be a comma-separated list of ids")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!ids.is_empty()).then_some(ids))
}

// GET /api/plays
async fn list_plays(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<PlayQuery>,
) -> Result<Json<Vec<PlayListItem>>, ApiError> {
    let filter = PlayFilter {
        title: query.title.filter(|t| !t.trim().is_empty()),
        genres: parse_ids("genres", query.genres.as_deref())?,
        actors: parse_ids("actors", query.actors.as_deref())?,
    };
    Ok(Json(state.catalog.list_plays(&filter).await?))
}

// GET /api/plays/{id}
async fn get_play(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PlayDetail>, ApiError> {
    state
        .catalog
        .get_play_detail(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "Play", id })
}

// POST /api/plays
async fn create_play(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiJson(req): ApiJson<CreatePlayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let play = state
        .catalog
        .create_play(req.title.trim(), &req.description, &req.genres, &req.actors)
        .await?;
    Ok((StatusCode::CREATED, Json(play)))
}

// POST /api/plays/{id}/upload-image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<PlayImageResponse>, ApiError> {
    let play = state
        .catalog
        .get_play(id)
        .await?
        .ok_or(ApiError::NotFound { resource: "Play", id })?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((file_name, data));
    }

    let (file_name, data) = upload
        .ok_or_else(|| ApiError::BadRequest("No file was submitted in field \"image\".".to_string()))?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("The submitted file is empty.".to_string()));
    }
    let extension = image_extension(&file_name).ok_or_else(|| {
        ApiError::BadRequest(format!("Allowed image extensions are: {}.", IMAGE_EXTENSIONS.join(", ")))
    })?;

    let relative = format!("uploads/plays/{}-{}.{}", slugify(&play.title), Uuid::new_v4(), extension);
    let target = PathBuf::from(&state.config.media.root).join(&relative);
    let play = save_upload(&target, &data, async {
        state
            .catalog
            .set_play_image(id, &relative)
            .await?
            .ok_or(ApiError::NotFound { resource: "Play", id })
    })
    .await?;

    tracing::info!("Image {} uploaded for play {} ({} bytes)", relative, id, data.len());
    Ok(Json(PlayImageResponse { id: play.id, image: play.image }))
}

/// Пишет файл и выполняет `commit`. Если `commit` не удался, файл удаляется.
async fn save_upload<T, F>(target: &FsPath, data: &[u8], commit: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ApiError::Other(e.into()))?;
    }
    tokio::fs::write(target, data)
        .await
        .map_err(|e| ApiError::Other(e.into()))?;

    let result = commit.await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(target).await {
            tracing::warn!("Failed to remove orphaned upload {}: {}", target.display(), e);
        }
    }
    result
}

/// Имя файла из названия: латиница и цифры, остальное через дефис
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "play".to_string()
    } else {
        slug.to_string()
    }
}

fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_keeps_words_and_collapses_separators() {
        assert_eq!(slugify("Hamlet"), "hamlet");
        assert_eq!(slugify("  The Cherry   Orchard!! "), "the-cherry-orchard");
        assert_eq!(slugify("Ревизор"), "play");
    }

    #[test]
    fn image_extension_is_whitelisted() {
        assert_eq!(image_extension("poster.PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("archive.tar.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("script.sh"), None);
        assert_eq!(image_extension("no_extension"), None);
    }

    #[tokio::test]
    async fn failed_commit_removes_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("uploads/plays/hamlet.png");

        let result: Result<(), ApiError> = save_upload(&target, b"png", async {
            Err(ApiError::NotFound { resource: "Play", id: 1 })
        })
        .await;

        assert!(matches!(result, Err(ApiError::NotFound { .. })));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn successful_commit_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("uploads/plays/hamlet.png");

        let id = save_upload(&target, b"png", async { Ok::<_, ApiError>(1) }).await.unwrap();

        assert_eq!(id, 1);
        assert_eq!(std::fs::read(&target).unwrap(), b"png");
    }

    #[test]
    fn id_lists_are_comma_separated() {
        assert_eq!(parse_ids("genres", Some("1, 2,,3")).unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(parse_ids("genres", Some("")).unwrap(), None);
        assert_eq!(parse_ids("genres", None).unwrap(), None);
        assert!(matches!(parse_ids("actors", Some("1,x")), Err(ApiError::BadRequest(_))));
    }
}
