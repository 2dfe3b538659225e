/// Width of the zero-padded frame index in frame file names.
pub const FRAME_INDEX_WIDTH: usize = 10;

pub const FRAME_EXTENSION: &str = "png";

/// ffmpeg image2 pattern matching the names produced by [`frame_file_name`].
pub const FRAME_PATTERN: &str = "%010d.png";

/// `0000000042.png` for frame 42.
pub fn frame_file_name(index: u64) -> String {
    format!(
        "{:0width$}.{}",
        index,
        FRAME_EXTENSION,
        width = FRAME_INDEX_WIDTH
    )
}

/// Inverse of [`frame_file_name`]. Anything that is not a frame name yields `None`.
pub fn parse_frame_index(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(FRAME_EXTENSION)?.strip_suffix('.')?;
    if stem.len() < FRAME_INDEX_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}
