//! Export file naming and atomic persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::models::document::Identity;

const GENERIC_NAME: &str = "resume";

/// `<declared name>.pdf`, else `<First>_<Last>_resume.pdf`, else `resume.pdf`.
pub fn export_file_name(declared: &str, identity: &Identity) -> String {
    let declared = sanitize(declared);
    if !declared.is_empty() {
        return format!("{declared}.pdf");
    }

    let parts: Vec<String> = [&identity.first_name, &identity.last_name]
        .into_iter()
        .map(|part| sanitize(part).replace(' ', "_"))
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        format!("{GENERIC_NAME}.pdf")
    } else {
        format!("{}_{GENERIC_NAME}.pdf", parts.join("_"))
    }
}

/// Drops path separators, reserved and control characters; collapses whitespace.
fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches('.').trim().to_string()
}

/// `attachment` header value with an ASCII fallback and an RFC 5987 UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

/// Writes through a temp file in `dir` and renames it into place, so a failed export
/// never leaves a partial file under the final name.
pub fn persist_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    let target = dir.join(file_name);
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(first: &str, last: &str) -> Identity {
        Identity {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Identity::default()
        }
    }

    #[test]
    fn test_declared_name_wins() {
        assert_eq!(export_file_name("Моё резюме", &identity("Ivan", "Petrov")), "Моё резюме.pdf");
    }

    #[test]
    fn test_falls_back_to_identity_then_generic() {
        assert_eq!(export_file_name("  ", &identity("Ivan", "Petrov")), "Ivan_Petrov_resume.pdf");
        assert_eq!(export_file_name("", &identity("Ivan", "")), "Ivan_resume.pdf");
        assert_eq!(export_file_name("", &identity("", "")), "resume.pdf");
    }

    #[test]
    fn test_unsafe_characters_removed() {
        assert_eq!(export_file_name("../a/b:c*?", &Identity::default()), "abc.pdf");
        assert_eq!(export_file_name("CV\n 2024", &Identity::default()), "CV 2024.pdf");
    }

    #[test]
    fn test_content_disposition_encodes_utf8() {
        let header = content_disposition("Резюме.pdf");
        assert!(header.starts_with("attachment; filename=\"______.pdf\""));
        assert!(header.contains("filename*=UTF-8''%D0%A0%D0%B5"));
        assert!(content_disposition("cv 1.pdf").contains("filename*=UTF-8''cv%201.pdf"));
    }

    #[test]
    fn test_persist_atomically_leaves_only_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = persist_atomically(dir.path(), "cv.pdf", b"%PDF-1.5").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
