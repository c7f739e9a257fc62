//! Description round-tripper.
//! Reads and replaces the bounded description region of a translation
//! file (`<ProgramName>/DESCRIPTIONTranslation_SF.xml` by caller
//! convention) without disturbing anything outside the region. The
//! supplied content is opaque: marker handling and report merging are
//! the caller's responsibility.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::DescriptionError;

/// Sentinel line callers append before autogenerated report text so
/// human-authored notes above it survive regeneration. The round-tripper
/// itself never interprets it.
pub const REPORT_MARKER: &str =
    "%%%Autogenerated Analysis Report. Do not edit below this line!%%%";

const OPEN_TAG: &str = "<Description>";
const CLOSE_TAG: &str = "</Description>";

/// Current description content at `path`.
pub fn get_pou_description(path: impl AsRef<Path>) -> Result<String, DescriptionError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let (start, end) = locate_region(&text, path)?;
    Ok(text[start..end].to_string())
}

/// Replace the description region and rewrite the whole file, so that a
/// subsequent [`get_pou_description`] returns exactly `new_content`.
pub fn change_pou_description(
    new_content: &str,
    path: impl AsRef<Path>,
) -> Result<(), DescriptionError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let (start, end) = locate_region(&text, path)?;

    let mut out = String::with_capacity(text.len() - (end - start) + new_content.len());
    out.push_str(&text[..start]);
    out.push_str(new_content);
    out.push_str(&text[end..]);

    fs::write(path, out).map_err(|source| DescriptionError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String, DescriptionError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            DescriptionError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            DescriptionError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

/// Byte range of the region content, exclusive of the container tags.
fn locate_region(text: &str, path: &Path) -> Result<(usize, usize), DescriptionError> {
    let malformed = |detail: &str| DescriptionError::MalformedDescriptionFile {
        path: path.display().to_string(),
        detail: detail.to_string(),
    };
    let open = text
        .find(OPEN_TAG)
        .ok_or_else(|| malformed("missing <Description> element"))?;
    let start = open + OPEN_TAG.len();
    let close = text[start..]
        .find(CLOSE_TAG)
        .ok_or_else(|| malformed("unterminated <Description> element"))?;
    Ok((start, start + close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CONTAINER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Translation Language=\"SF\">\n  \
<Description>Human authored notes.</Description>\n\
</Translation>\n";

    fn temp_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pou-description-{}.xml",
            uuid::Uuid::new_v4()
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_the_region_content() {
        let path = temp_file(CONTAINER);
        assert_eq!(get_pou_description(&path).unwrap(), "Human authored notes.");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn round_trip_returns_exactly_what_was_written() {
        let path = temp_file(CONTAINER);
        let report = format!("Notes kept.\n{REPORT_MARKER}\nMetrics:\nNum_Inputs: 1\n");
        change_pou_description(&report, &path).unwrap();
        assert_eq!(get_pou_description(&path).unwrap(), report);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn content_outside_the_region_is_preserved_byte_for_byte() {
        let path = temp_file(CONTAINER);
        change_pou_description("replaced", &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Translation Language=\"SF\">\n  <Description>"));
        assert!(text.ends_with("</Description>\n</Translation>\n"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let path = std::env::temp_dir().join("no-such-description.xml");
        assert!(matches!(
            get_pou_description(&path),
            Err(DescriptionError::FileNotFound { .. })
        ));
    }

    #[test]
    fn missing_container_is_malformed() {
        let path = temp_file("<Translation></Translation>");
        assert!(matches!(
            get_pou_description(&path),
            Err(DescriptionError::MalformedDescriptionFile { .. })
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unterminated_container_is_malformed() {
        let path = temp_file("<Translation><Description>half open");
        assert!(matches!(
            get_pou_description(&path),
            Err(DescriptionError::MalformedDescriptionFile { .. })
        ));
        fs::remove_file(&path).unwrap();
    }
}
