//! Minimal `multipart/form-data` encoding for single-file uploads.

use uuid::Uuid;

/// An encoded multipart body and the `Content-Type` header that describes it.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Encode one file field with a random boundary.
pub fn file_part(field: &str, file_name: &str, mime: &str, contents: &[u8]) -> MultipartBody {
    let boundary = format!("----fmr-{}", Uuid::new_v4().simple());
    file_part_with_boundary(&boundary, field, file_name, mime, contents)
}

pub fn file_part_with_boundary(
    boundary: &str,
    field: &str,
    file_name: &str,
    mime: &str,
    contents: &[u8],
) -> MultipartBody {
    let file_name = file_name.replace('"', "%22");
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    MultipartBody {
        content_type: format!("multipart/form-data; boundary={boundary}"),
        body,
    }
}
