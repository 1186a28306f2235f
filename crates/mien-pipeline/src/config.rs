use std::path::PathBuf;

/// Pipeline configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the JSON gallery file.
    pub gallery_path: PathBuf,
    /// Cosine similarity a probe must exceed for a positive match.
    pub match_threshold: f32,
    /// Number of descriptor samples collected per enrollment.
    pub enroll_samples: usize,
}

impl Config {
    /// Load configuration from `MIEN_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("mien");

        let gallery_path = std::env::var("MIEN_GALLERY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("gallery.json"));

        Self {
            gallery_path,
            match_threshold: env_f32("MIEN_MATCH_THRESHOLD", mien_core::MATCH_THRESHOLD),
            enroll_samples: env_usize("MIEN_ENROLL_SAMPLES", 5),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
