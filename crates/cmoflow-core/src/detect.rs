//! Content type detection from file header bytes and file extensions.

/// Sniff a MIME type from the leading bytes of a payload.
///
/// Signature matching is delegated to `infer`. PDF headers are also checked
/// directly, so documents without a declared type still get a meaningful
/// label.
pub fn sniff_content_type(header: &[u8]) -> Option<&'static str> {
    infer::get(header)
        .map(|kind| kind.mime_type())
        .or_else(|| header.starts_with(b"%PDF-").then_some("application/pdf"))
}

/// Map a file extension to the content type a file picker would declare.
///
/// The lookup is case-insensitive and accepts the extension with or without
/// its leading dot.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime)
}
