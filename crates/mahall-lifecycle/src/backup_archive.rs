use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

const ZIP_LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";
const ZIP_EXTENSION: &str = "zip";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No backup archive was selected.")]
    EmptyArchivePath,
    #[error("Backup archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),
    #[error("Backup archive is not a file: {}", .0.display())]
    ArchiveNotAFile(PathBuf),
    #[error("Backup archive must be a .zip file: {}", .0.display())]
    NotZipExtension(PathBuf),
    #[error("Backup archive is not a valid ZIP file: {}", .0.display())]
    BadZipHeader(PathBuf),
    #[error("Failed to read backup archive {}: {source}", .path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No backup destination was given.")]
    EmptyDestination,
    #[error("Backup destination folder does not exist: {}", .0.display())]
    DestinationFolderMissing(PathBuf),
}

/// Checks that `raw` names an existing ZIP archive before anything
/// destructive runs against it.
pub fn validate_backup_archive(raw: &str) -> Result<PathBuf, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyArchivePath);
    }
    let path = PathBuf::from(trimmed);
    if !path.exists() {
        return Err(ValidationError::ArchiveNotFound(path));
    }
    if !path.is_file() {
        return Err(ValidationError::ArchiveNotAFile(path));
    }
    if !has_zip_extension(&path) {
        return Err(ValidationError::NotZipExtension(path));
    }

    let mut header = [0_u8; 4];
    let read = File::open(&path).and_then(|mut file| file.read_exact(&mut header));
    match read {
        Ok(()) if header == ZIP_LOCAL_HEADER_MAGIC => Ok(path),
        Ok(()) => Err(ValidationError::BadZipHeader(path)),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            Err(ValidationError::BadZipHeader(path))
        }
        Err(source) => Err(ValidationError::ArchiveRead { path, source }),
    }
}

/// Resolves where a new backup is written; `.zip` is appended when missing.
pub fn normalize_backup_destination(raw: &str) -> Result<PathBuf, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDestination);
    }
    let mut path = PathBuf::from(trimmed);
    if !has_zip_extension(&path) {
        let mut file_name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
        file_name.push(".zip");
        path.set_file_name(file_name);
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ValidationError::DestinationFolderMissing(parent.to_path_buf()))
        }
        _ => Ok(path),
    }
}

fn has_zip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(ZIP_EXTENSION))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn validate_backup_archive_accepts_zip_with_local_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("backup.ZIP");
        fs::write(&archive, b"PK\x03\x04rest-of-archive").expect("write archive");

        let validated =
            validate_backup_archive(&format!("  {}  ", archive.display())).expect("valid");

        assert_eq!(validated, archive);
    }

    #[test]
    fn validate_backup_archive_rejects_empty_and_missing_paths() {
        assert!(matches!(
            validate_backup_archive("   "),
            Err(ValidationError::EmptyArchivePath)
        ));

        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.zip");
        let error = validate_backup_archive(&missing.display().to_string()).expect_err("missing");
        assert!(error.to_string().contains("not found"));
    }

    #[test]
    fn validate_backup_archive_rejects_directory_and_wrong_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("folder.zip");
        fs::create_dir(&folder).expect("mkdir");
        let text = dir.path().join("notes.txt");
        fs::write(&text, b"PK\x03\x04").expect("write");

        assert!(matches!(
            validate_backup_archive(&folder.display().to_string()),
            Err(ValidationError::ArchiveNotAFile(_))
        ));
        assert!(matches!(
            validate_backup_archive(&text.display().to_string()),
            Err(ValidationError::NotZipExtension(_))
        ));
    }

    #[test]
    fn validate_backup_archive_rejects_bad_or_short_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip at all").expect("write");
        let short = dir.path().join("short.zip");
        fs::write(&short, b"PK").expect("write");

        assert!(matches!(
            validate_backup_archive(&bogus.display().to_string()),
            Err(ValidationError::BadZipHeader(_))
        ));
        assert!(matches!(
            validate_backup_archive(&short.display().to_string()),
            Err(ValidationError::BadZipHeader(_))
        ));
    }

    #[test]
    fn normalize_backup_destination_appends_zip_extension() {
        let dir = tempfile::tempdir().expect("tempdir");

        let path = normalize_backup_destination(&dir.path().join("mahall-backup").display().to_string())
            .expect("destination");
        assert_eq!(path, dir.path().join("mahall-backup.zip"));

        let kept = normalize_backup_destination(&dir.path().join("keep.zip").display().to_string())
            .expect("destination");
        assert_eq!(kept, dir.path().join("keep.zip"));
    }

    #[test]
    fn normalize_backup_destination_requires_existing_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("missing").join("backup.zip");

        assert!(matches!(
            normalize_backup_destination(&nested.display().to_string()),
            Err(ValidationError::DestinationFolderMissing(_))
        ));
        assert!(matches!(
            normalize_backup_destination(""),
            Err(ValidationError::EmptyDestination)
        ));
    }
}
