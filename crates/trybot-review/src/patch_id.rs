use thiserror::Error;
use trybot_core::PatchId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchIdError {
    #[error("no line containing {0:?} in upload output")]
    NoReviewLine(String),
    #[error("no patch number in upload line {0:?}")]
    NoNumber(String),
}

/// Pulls the patch id out of the upload tool's stderr.
///
/// The first line mentioning `marker` carries the id as its first run of
/// digits. If that line also mentions `internal_marker` the id is tagged for
/// the internal review instance.
pub fn parse_patch_id(stderr: &str, marker: &str, internal_marker: &str) -> Result<PatchId, PatchIdError> {
    let line = stderr
        .lines()
        .find(|l| l.contains(marker))
        .ok_or_else(|| PatchIdError::NoReviewLine(marker.to_string()))?;

    let digits: String = line
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(PatchIdError::NoNumber(line.to_string()));
    }

    if line.contains(internal_marker) {
        Ok(PatchId::internal(&digits))
    } else {
        Ok(PatchId::from_str(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_instance_gets_star() {
        let err = "Counting objects: 5\nremote: new review gerrit-int https://... 778899\n";
        assert_eq!(parse_patch_id(err, "gerrit", "gerrit-int").unwrap().as_str(), "*778899");
    }

    #[test]
    fn external_instance_plain_number() {
        let err = "remote: new review gerrit https://... 778899";
        assert_eq!(parse_patch_id(err, "gerrit", "gerrit-int").unwrap().as_str(), "778899");
    }

    #[test]
    fn first_marker_line_wins() {
        let err = "remote: gerrit 11\nremote: gerrit 22\n";
        assert_eq!(parse_patch_id(err, "gerrit", "gerrit-int").unwrap().as_str(), "11");
    }

    #[test]
    fn missing_line_or_number() {
        assert_eq!(
            parse_patch_id("nothing here", "gerrit", "gerrit-int"),
            Err(PatchIdError::NoReviewLine("gerrit".into()))
        );
        assert!(matches!(parse_patch_id("gerrit says no", "gerrit", "gerrit-int"), Err(PatchIdError::NoNumber(_))));
    }
}
