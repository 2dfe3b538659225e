use std::cmp::Reverse;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use common::log::{debug, info};
use common::utils::{FRAME_PATTERN, frame_file_name, parse_frame_index};
use common::{RecorderError, Result};

static DIR_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A fresh working directory under the system temp dir.
///
/// The name combines a millisecond timestamp, the process id and a
/// process-wide sequence number, so two sessions created in the same
/// millisecond still get distinct directories.
pub fn default_working_dir() -> PathBuf {
    let seq = DIR_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "shotreel-{}-{}-{}",
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        std::process::id(),
        seq
    ))
}

/// The numbered PNG files of one recording session.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn ensure_dir(&self) -> Result<()> {
        if self.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|e| RecorderError::filesystem(&self.dir, e))?;
        info!("[storage] created working directory {}", self.dir.display());
        Ok(())
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }

    /// Input pattern for an image2 demuxer reading this store.
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.join(FRAME_PATTERN)
    }

    pub fn write_frame(&self, index: u64, data: &[u8]) -> Result<PathBuf> {
        let path = self.frame_path(index);
        fs::write(&path, data).map_err(|e| RecorderError::filesystem(&path, e))?;
        debug!("[storage] wrote frame {} ({} bytes)", index, data.len());
        Ok(path)
    }

    /// All frame files currently on disk, ordered by index.
    pub fn frames(&self) -> Result<Vec<(u64, PathBuf)>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| RecorderError::filesystem(&self.dir, e))?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RecorderError::filesystem(&self.dir, e))?;
            let name = entry.file_name();
            if let Some(index) = name.to_str().and_then(parse_frame_index) {
                frames.push((index, entry.path()));
            }
        }
        frames.sort_by_key(|(index, _)| *index);
        Ok(frames)
    }

    /// Deletes every file in the directory, then the directory itself.
    /// A directory that is already gone is not an error.
    ///
    /// Frames are removed highest index first and before any other file, so
    /// if a removal fails the frames left on disk are still `0..n`.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(RecorderError::filesystem(&self.dir, e)),
        };

        let mut frames = Vec::new();
        let mut others = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RecorderError::filesystem(&self.dir, e))?;
            match entry.file_name().to_str().and_then(parse_frame_index) {
                Some(index) => frames.push((index, entry.path())),
                None => others.push(entry.path()),
            }
        }
        frames.sort_by_key(|(index, _)| Reverse(*index));

        let mut removed = 0;
        for path in frames.into_iter().map(|(_, path)| path).chain(others) {
            fs::remove_file(&path).map_err(|e| RecorderError::filesystem(&path, e))?;
            removed += 1;
        }
        fs::remove_dir(&self.dir).map_err(|e| RecorderError::filesystem(&self.dir, e))?;

        info!(
            "[storage] removed {} files and {}",
            removed,
            self.dir.display()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_dirs_are_unique_and_under_temp() {
        let a = default_working_dir();
        let b = default_working_dir();
        assert_ne!(a, b);
        assert!(a.starts_with(std::env::temp_dir()));
        assert!(b.starts_with(std::env::temp_dir()));
    }

    #[test]
    fn writes_and_lists_frames_in_index_order() {
        let root = tempdir().unwrap();
        let store = FrameStore::new(root.path().join("frames"));
        store.ensure_dir().unwrap();

        for index in [2u64, 0, 11, 1] {
            store.write_frame(index, &[index as u8]).unwrap();
        }
        fs::write(store.dir().join("notes.txt"), b"ignored").unwrap();

        let frames = store.frames().unwrap();
        let indices: Vec<u64> = frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 11]);
        assert_eq!(frames[3].1, store.dir().join("0000000011.png"));
        assert_eq!(fs::read(&frames[3].1).unwrap(), vec![11]);
    }

    #[test]
    fn clear_removes_everything_including_the_dir() {
        let root = tempdir().unwrap();
        let store = FrameStore::new(root.path().join("frames"));
        store.ensure_dir().unwrap();
        store.write_frame(0, b"a").unwrap();
        store.write_frame(1, b"b").unwrap();
        fs::write(store.dir().join("stray"), b"c").unwrap();

        assert_eq!(store.clear().unwrap(), 3);
        assert!(!store.exists());
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn failed_clear_removes_the_frames_first() {
        let root = tempdir().unwrap();
        let store = FrameStore::new(root.path().join("frames"));
        store.ensure_dir().unwrap();
        for index in 0..4 {
            store.write_frame(index, b"png").unwrap();
        }
        fs::create_dir(store.dir().join("thumbnails")).unwrap();

        match store.clear() {
            Err(RecorderError::Filesystem { path, .. }) => {
                assert_eq!(path, store.dir().join("thumbnails"))
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(store.frames().unwrap().is_empty());
        assert!(store.exists());
    }

    #[test]
    fn frames_of_a_missing_dir_is_a_filesystem_error() {
        let root = tempdir().unwrap();
        let store = FrameStore::new(root.path().join("missing"));
        match store.frames() {
            Err(RecorderError::Filesystem { path, .. }) => assert_eq!(path, store.dir()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn input_pattern_matches_frame_names() {
        let store = FrameStore::new("/data/frames");
        assert_eq!(store.input_pattern(), PathBuf::from("/data/frames/%010d.png"));
        assert_eq!(store.frame_path(3), PathBuf::from("/data/frames/0000000003.png"));
    }
}
