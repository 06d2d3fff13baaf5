use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::character_sets::{self, CreateSetError, NewCharacterSet, UpdatePinyinError};
use crate::services::encoding::EncodingError;
use crate::services::ingestion::{self, ImportError};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "fontFile";

#[derive(Debug, Deserialize)]
pub struct UpdatePinyinRequest {
    pinyin: Vec<String>,
}

impl From<ImportError> for AppError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NoFile | ImportError::NoValidCharacters => {
                AppError::validation(err.to_string())
            }
            ImportError::Encoding(EncodingError::Empty) => AppError::validation(err.to_string()),
            ImportError::Encoding(EncodingError::Undecodable) => {
                AppError::encoding(err.to_string())
            }
            ImportError::DuplicateName(_) => AppError::conflict(err.to_string()),
            ImportError::Persistence(source) => AppError::persistence("导入文件时发生服务器错误。", source),
        }
    }
}

impl From<CreateSetError> for AppError {
    fn from(err: CreateSetError) -> Self {
        match err {
            CreateSetError::DuplicateName(_) => AppError::conflict(err.to_string()),
            CreateSetError::Persistence(source) => AppError::persistence("创建字库时发生服务器内部错误", source),
            _ => AppError::validation(err.to_string()),
        }
    }
}

impl From<UpdatePinyinError> for AppError {
    fn from(err: UpdatePinyinError) -> Self {
        match err {
            UpdatePinyinError::NotFound => AppError::not_found(err.to_string()),
            UpdatePinyinError::InvalidSyllable(_) => AppError::validation(err.to_string()),
            UpdatePinyinError::Sqlx(source) => AppError::persistence("更新拼音失败", source),
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Response, AppError> {
    let sets = character_sets::list_character_sets(state.db(), state.cache())
        .await
        .map_err(|err| AppError::persistence("获取字库列表失败", err))?;
    Ok(ok(sets).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewCharacterSet>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload.map_err(|_| AppError::validation("请求体不是有效的JSON格式。"))?;
    let created = character_sets::create_character_set(
        state.db(),
        state.resolver(),
        state.listing_invalidator(),
        input,
    )
    .await?;
    Ok((StatusCode::CREATED, ok(created)).into_response())
}

pub async fn import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "multipart parse failed");
                return Err(AppError::validation("上传内容无法解析。"));
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|err| {
            tracing::warn!(error = %err, "upload read failed");
            AppError::validation("上传内容无法解析。")
        })?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, raw)) = upload else {
        return Err(ImportError::NoFile.into());
    };

    let imported = ingestion::import_character_file(
        state.db(),
        state.resolver(),
        state.listing_invalidator(),
        &raw,
        &filename,
    )
    .await?;
    Ok((StatusCode::CREATED, ok(imported)).into_response())
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let set = character_sets::get_character_set_with_characters(state.db(), &id)
        .await
        .map_err(|err| AppError::persistence("获取字库详情失败", err))?
        .ok_or_else(|| AppError::not_found("未找到指定ID的字库"))?;
    Ok(ok(set).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = character_sets::delete_character_set(state.db(), state.listing_invalidator(), &id)
        .await
        .map_err(|err| AppError::persistence("删除字库失败", err))?;
    if !deleted {
        return Err(AppError::not_found("未找到指定ID的字库"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_pinyin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePinyinRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|_| AppError::validation("请求参数不合法"))?;
    let character = character_sets::update_character_pinyin(state.db(), &id, &body.pinyin).await?;
    Ok(ok(character).into_response())
}
