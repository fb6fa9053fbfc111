//! Request routing for the gallery wire protocol

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{header, Method, Request, Response, StatusCode};
use picstash_core::protocol::{
    DeleteRequest, DeleteResponse, ListResponse, UploadResponse, NOT_FOUND_ERROR,
};
use picstash_core::{FsImageStore, ImageStore, UploadFile};
use serde::Serialize;
use tracing::{error, warn};

/// Multipart field the gallery uploads files under
const UPLOAD_FIELD: &str = "images[]";

pub async fn handle_request(
    req: Request<Incoming>,
    store: Arc<FsImageStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (method, path.as_str()) {
        (Method::POST, "/api/images/upload") => handle_upload(req, &store).await,
        (Method::GET, "/api/images/list") => handle_list(&store).await,
        (Method::POST, "/api/images/delete") => handle_delete(req, &store).await,
        _ => json_response(
            StatusCode::NOT_FOUND,
            &serde_json::json!({ "ok": false, "error": "Unknown action" }),
        ),
    };

    Ok(response)
}

async fn handle_upload(req: Request<Incoming>, store: &FsImageStore) -> Response<Full<Bytes>> {
    let boundary = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok());
    let Some(boundary) = boundary else {
        return upload_failure("No files to upload");
    };

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read upload body: {}", e);
            return upload_failure("Upload failed");
        }
    };

    let mut multipart = multer::Multipart::new(
        stream::once(async move { Ok::<Bytes, Infallible>(body) }),
        boundary,
    );

    let mut files = Vec::new();
    let mut read_errors = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let field_name = field.name().unwrap_or_default().to_string();
                if field_name != UPLOAD_FIELD && field_name != "images" {
                    continue;
                }

                let original = field.file_name().unwrap_or("unnamed").to_string();
                match field.bytes().await {
                    Ok(data) => files.push(UploadFile::new(original, data.to_vec())),
                    Err(e) => {
                        warn!("failed to read upload part {}: {}", original, e);
                        read_errors.push(format!("Failed to read file: {}", original));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("malformed multipart body: {}", e);
                return upload_failure("Invalid upload request");
            }
        }
    }

    if files.is_empty() && !read_errors.is_empty() {
        return upload_failure(&read_errors.join(", "));
    }

    match store.upload(files).await {
        Ok(mut report) => {
            report.errors.extend(read_errors);
            if report.ok() {
                json_response(
                    StatusCode::OK,
                    &UploadResponse {
                        ok: true,
                        uploaded: report.uploaded,
                        errors: report.errors,
                        error: None,
                    },
                )
            } else {
                upload_failure(&report.error_summary())
            }
        }
        Err(e) => {
            error!("upload failed: {}", e);
            upload_failure("Upload failed")
        }
    }
}

async fn handle_list(store: &FsImageStore) -> Response<Full<Bytes>> {
    match store.list().await {
        Ok(images) => json_response(
            StatusCode::OK,
            &ListResponse {
                ok: true,
                images,
                error: None,
            },
        ),
        Err(e) => {
            error!("list failed: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ListResponse {
                    ok: false,
                    images: Vec::new(),
                    error: Some("Failed to list images".to_string()),
                },
            )
        }
    }
}

async fn handle_delete(req: Request<Incoming>, store: &FsImageStore) -> Response<Full<Bytes>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read delete body: {}", e);
            return delete_failure("No filename given");
        }
    };

    let request: DeleteRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return delete_failure("No filename given"),
    };
    if request.filename.is_empty() {
        return delete_failure("No filename given");
    }

    match store.delete(&request.filename).await {
        Ok(true) => json_response(
            StatusCode::OK,
            &DeleteResponse {
                ok: true,
                message: Some("File deleted".to_string()),
                error: None,
            },
        ),
        Ok(false) => delete_failure(NOT_FOUND_ERROR),
        Err(e) => {
            warn!("delete of {} failed: {}", request.filename, e);
            delete_failure(&e.to_string())
        }
    }
}

fn upload_failure(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &UploadResponse {
            ok: false,
            error: Some(message.to_string()),
            ..Default::default()
        },
    )
}

fn delete_failure(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &DeleteResponse {
            ok: false,
            message: None,
            error: Some(message.to_string()),
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| br#"{"ok":false}"#.to_vec());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(json)))
        .expect("response builder with static parts")
}
