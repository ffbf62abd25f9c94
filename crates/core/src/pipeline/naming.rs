//! Output file naming.

use std::path::Path;

/// Characters that cannot appear in a file name on common filesystems.
const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace characters invalid in file names with `_`.
pub fn sanitize_file_component(s: &str) -> String {
    s.chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Canonical name for an encoded episode: `[{uploader}] {name} [{episode:02}].{ext}`.
///
/// The extension is taken from `source`, defaulting to `mkv`.
pub fn canonical_file_name(uploader: &str, name: &str, episode: u32, source: &Path) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or("mkv");

    format!(
        "[{}] {} [{:02}].{}",
        sanitize_file_component(uploader),
        sanitize_file_component(name),
        episode,
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_file_name() {
        let name = canonical_file_name(
            "SubsPlease",
            "Frieren",
            3,
            Path::new("/data/Frieren - 03.mkv-encoded.mkv"),
        );
        assert_eq!(name, "[SubsPlease] Frieren [03].mkv");
    }

    #[test]
    fn test_canonical_file_name_wide_episode_and_extension() {
        assert_eq!(
            canonical_file_name("G", "One Piece", 1085, Path::new("/x/out.mp4")),
            "[G] One Piece [1085].mp4"
        );
        assert_eq!(
            canonical_file_name("G", "Show", 1, Path::new("/x/out")),
            "[G] Show [01].mkv"
        );
    }

    #[test]
    fn test_sanitize_invalid_characters() {
        assert_eq!(
            sanitize_file_component("Re:Zero / Part 2?"),
            "Re_Zero _ Part 2_"
        );
        assert_eq!(
            canonical_file_name("A|B", "Fate/stay night", 12, Path::new("x.mkv")),
            "[A_B] Fate_stay night [12].mkv"
        );
    }
}
