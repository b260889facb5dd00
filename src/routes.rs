use std::sync::Arc;
use bytes::Bytes;
use poem_openapi::param::{Path, Query};
use poem_openapi::payload::{Binary, Json};
use poem_openapi::{ApiResponse, Object, OpenApi};

use crate::controller::{Deletion, PhotoFacade, PhotoPayload, UploadedPhoto};
use crate::error::PhotoError;

#[derive(Object, Debug)]
pub struct Detail {
    /// Additional information regarding the response.
    detail: String,
}

impl Detail {
    fn from_error(e: &PhotoError) -> Json<Self> {
        Json(Self { detail: e.to_string() })
    }
}

#[derive(Object, Debug)]
pub struct UploadInfo {
    /// The public URL of the photo.
    ///
    /// This is also the handle used to delete the photo again.
    url: String,

    /// The generated name of the stored photo.
    blob_name: String,

    /// The container the category maps to.
    container: String,

    /// The size of the photo in bytes.
    size: u64,

    /// The crc32 checksum of the uploaded photo.
    checksum: u32,

    /// If the category's container was created by this upload.
    container_created: bool,
}

impl From<UploadedPhoto> for UploadInfo {
    fn from(photo: UploadedPhoto) -> Self {
        Self {
            url: photo.url,
            blob_name: photo.blob_name,
            container: photo.container,
            size: photo.size as u64,
            checksum: photo.checksum,
            container_created: photo.container_created,
        }
    }
}

#[derive(Object, Debug)]
pub struct DeleteInfo {
    /// If the request succeeded, this is also `true` when no URL was given.
    deleted: bool,

    /// If no URL was given so nothing had to be removed.
    nothing_to_delete: bool,

    /// If the category's container was removed after its last photo.
    container_removed: bool,
}

#[derive(Object, Debug)]
pub struct PhotoList {
    /// The public URLs of every photo in the category.
    urls: Vec<String>,
}

#[derive(ApiResponse)]
pub enum UploadResponse {
    #[oai(status = 200)]
    Ok(Json<UploadInfo>),

    /// The photo or category was empty.
    #[oai(status = 400)]
    BadRequest(Json<Detail>),

    /// The photo exceeds the configured upload limit.
    #[oai(status = 413)]
    TooBig(Json<Detail>),

    /// The storage backend failed to store the photo.
    #[oai(status = 502)]
    BackendFailure(Json<Detail>),
}

#[derive(ApiResponse)]
pub enum DeleteResponse {
    #[oai(status = 200)]
    Ok(Json<DeleteInfo>),

    #[oai(status = 400)]
    BadRequest(Json<Detail>),

    /// The photo does not exist.
    #[oai(status = 404)]
    NotFound(Json<Detail>),

    #[oai(status = 502)]
    BackendFailure(Json<Detail>),
}

#[derive(ApiResponse)]
pub enum ListResponse {
    #[oai(status = 200)]
    Ok(Json<PhotoList>),

    #[oai(status = 400)]
    BadRequest(Json<Detail>),

    #[oai(status = 502)]
    BackendFailure(Json<Detail>),
}

pub struct PhotoApi {
    facade: Arc<PhotoFacade>,
}

impl PhotoApi {
    pub fn new(facade: Arc<PhotoFacade>) -> Self {
        Self { facade }
    }
}

#[OpenApi]
impl PhotoApi {
    /// Upload Photo
    ///
    /// Stores the request body as a new photo in the given category,
    /// creating the category's container if needed.
    #[oai(path = "/:category", method = "post")]
    pub async fn upload_photo(
        &self,
        category: Path<String>,
        file_name: Query<String>,
        content_type: Query<Option<String>>,
        file: Binary<Vec<u8>>,
    ) -> UploadResponse {
        let payload = PhotoPayload {
            file_name: file_name.0,
            content_type: content_type.0,
            data: Bytes::from(file.0),
        };

        match self.facade.upload(&category.0, Some(payload)).await {
            Ok(photo) => UploadResponse::Ok(Json(photo.into())),
            Err(e @ (PhotoError::NoInput | PhotoError::EmptyCategory)) => {
                UploadResponse::BadRequest(Detail::from_error(&e))
            },
            Err(e @ PhotoError::TooLarge { .. }) => UploadResponse::TooBig(Detail::from_error(&e)),
            Err(e) => UploadResponse::BackendFailure(Detail::from_error(&e)),
        }
    }

    /// Delete Photo
    ///
    /// Removes a photo by the URL it was uploaded as.
    #[oai(path = "/:category", method = "delete")]
    pub async fn delete_photo(
        &self,
        category: Path<String>,
        url: Query<Option<String>>,
    ) -> DeleteResponse {
        let url = url.0.unwrap_or_default();

        match self.facade.delete(&category.0, &url).await {
            Ok(Deletion::NothingToDelete) => DeleteResponse::Ok(Json(DeleteInfo {
                deleted: true,
                nothing_to_delete: true,
                container_removed: false,
            })),
            Ok(Deletion::Deleted { container_removed }) => DeleteResponse::Ok(Json(DeleteInfo {
                deleted: true,
                nothing_to_delete: false,
                container_removed,
            })),
            Err(e @ PhotoError::NotFound { .. }) => DeleteResponse::NotFound(Detail::from_error(&e)),
            Err(e @ PhotoError::EmptyCategory) => DeleteResponse::BadRequest(Detail::from_error(&e)),
            Err(e) => DeleteResponse::BackendFailure(Detail::from_error(&e)),
        }
    }

    /// List Photos
    ///
    /// The URLs of every photo stored in the given category.
    #[oai(path = "/:category", method = "get")]
    pub async fn list_photos(&self, category: Path<String>) -> ListResponse {
        match self.facade.list(&category.0).await {
            Ok(urls) => ListResponse::Ok(Json(PhotoList { urls })),
            Err(e @ PhotoError::EmptyCategory) => ListResponse::BadRequest(Detail::from_error(&e)),
            Err(e) => ListResponse::BackendFailure(Detail::from_error(&e)),
        }
    }
}
