use catalog_model::FileType;

/// MIME type and content category for a lowercase extension.
pub fn classify_extension(extension: &str) -> (Option<&'static str>, FileType) {
    let (mime, file_type) = match extension {
        // video
        "mkv" => ("video/x-matroska", FileType::Video),
        "mp4" | "m4v" => ("video/mp4", FileType::Video),
        "avi" => ("video/x-msvideo", FileType::Video),
        "mov" => ("video/quicktime", FileType::Video),
        "wmv" => ("video/x-ms-wmv", FileType::Video),
        "flv" => ("video/x-flv", FileType::Video),
        "webm" => ("video/webm", FileType::Video),
        "ts" | "m2ts" => ("video/mp2t", FileType::Video),
        "mpg" | "mpeg" => ("video/mpeg", FileType::Video),
        // audio
        "mp3" => ("audio/mpeg", FileType::Audio),
        "flac" => ("audio/flac", FileType::Audio),
        "wav" => ("audio/wav", FileType::Audio),
        "aac" => ("audio/aac", FileType::Audio),
        "ogg" | "oga" => ("audio/ogg", FileType::Audio),
        "m4a" => ("audio/mp4", FileType::Audio),
        "wma" => ("audio/x-ms-wma", FileType::Audio),
        "ape" => ("audio/x-ape", FileType::Audio),
        "opus" => ("audio/opus", FileType::Audio),
        // image
        "jpg" | "jpeg" => ("image/jpeg", FileType::Image),
        "png" => ("image/png", FileType::Image),
        "gif" => ("image/gif", FileType::Image),
        "bmp" => ("image/bmp", FileType::Image),
        "webp" => ("image/webp", FileType::Image),
        "tif" | "tiff" => ("image/tiff", FileType::Image),
        "svg" => ("image/svg+xml", FileType::Image),
        // books and comics
        "epub" => ("application/epub+zip", FileType::Book),
        "mobi" => ("application/x-mobipocket-ebook", FileType::Book),
        "azw3" => ("application/vnd.amazon.ebook", FileType::Book),
        "pdf" => ("application/pdf", FileType::Book),
        "djvu" => ("image/vnd.djvu", FileType::Book),
        "cbr" => ("application/vnd.comicbook-rar", FileType::Book),
        "cbz" => ("application/vnd.comicbook+zip", FileType::Book),
        "cb7" => ("application/x-cb7", FileType::Book),
        // installers and disc images
        "exe" => ("application/vnd.microsoft.portable-executable", FileType::Software),
        "msi" => ("application/x-msi", FileType::Software),
        "dmg" => ("application/x-apple-diskimage", FileType::Software),
        "deb" => ("application/vnd.debian.binary-package", FileType::Software),
        "rpm" => ("application/x-rpm", FileType::Software),
        "appimage" => ("application/vnd.appimage", FileType::Software),
        "apk" => ("application/vnd.android.package-archive", FileType::Software),
        "iso" => ("application/x-iso9660-image", FileType::Software),
        "img" | "bin" | "nrg" => ("application/octet-stream", FileType::Software),
        // archives
        "zip" => ("application/zip", FileType::Archive),
        "rar" => ("application/vnd.rar", FileType::Archive),
        "7z" => ("application/x-7z-compressed", FileType::Archive),
        "tar" => ("application/x-tar", FileType::Archive),
        "gz" | "tgz" => ("application/gzip", FileType::Archive),
        "bz2" => ("application/x-bzip2", FileType::Archive),
        "xz" => ("application/x-xz", FileType::Archive),
        // documents
        "txt" | "nfo" => ("text/plain", FileType::Document),
        "md" => ("text/markdown", FileType::Document),
        "doc" => ("application/msword", FileType::Document),
        "docx" => (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            FileType::Document,
        ),
        "odt" => ("application/vnd.oasis.opendocument.text", FileType::Document),
        "rtf" => ("application/rtf", FileType::Document),
        "xls" | "xlsx" | "csv" => ("text/csv", FileType::Document),
        "srt" => ("application/x-subrip", FileType::Document),
        "sub" | "ass" | "vtt" => ("text/vtt", FileType::Document),
        // source code
        "rs" => ("text/x-rust", FileType::Code),
        "go" => ("text/x-go", FileType::Code),
        "py" => ("text/x-python", FileType::Code),
        "js" | "mjs" => ("text/javascript", FileType::Code),
        "c" | "h" => ("text/x-c", FileType::Code),
        "cpp" | "hpp" | "cc" => ("text/x-c++", FileType::Code),
        "java" => ("text/x-java", FileType::Code),
        "sh" => ("application/x-sh", FileType::Code),
        "json" => ("application/json", FileType::Code),
        "toml" => ("application/toml", FileType::Code),
        "yaml" | "yml" => ("application/yaml", FileType::Code),
        "html" | "htm" => ("text/html", FileType::Code),
        "css" => ("text/css", FileType::Code),
        _ => return (None, FileType::Other),
    };
    (Some(mime), file_type)
}
