use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetResolveError {
    #[error("could not determine asset cache directory")]
    NoCacheDir,
    #[error("failed to create asset cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write asset to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Download progress callback: `(bytes_so_far, total_bytes)`, total 0 when the
/// server sent no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64)>;

/// Resolves a named asset (detection model, label font) to a local path.
///
/// Lookup order: user cache directory, then an optional bundled directory,
/// then download from `url` into the cache.
pub fn resolve_asset(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, AssetResolveError> {
    let cache_dir = asset_cache_dir()?;
    let cached = cache_dir.join(name);
    if cached.exists() {
        return Ok(cached);
    }

    if let Some(dir) = bundled_dir {
        let bundled = dir.join(name);
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    fs::create_dir_all(&cache_dir).map_err(AssetResolveError::CacheDir)?;
    download(url, &cached, progress)?;
    Ok(cached)
}

/// Platform cache directory for downloaded assets
/// (e.g. `~/.cache/courtvision/assets` on Linux).
pub fn asset_cache_dir() -> Result<PathBuf, AssetResolveError> {
    dirs::cache_dir()
        .map(|d| d.join("courtvision").join("assets"))
        .ok_or(AssetResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), AssetResolveError> {
    let response = reqwest::blocking::get(url).map_err(|e| AssetResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;
    let total = response.content_length().unwrap_or(0);

    let bytes = response.bytes().map_err(|e| AssetResolveError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Stage into a .part file and rename so an interrupted download never
    // leaves a truncated asset at the final path.
    let staged = dest.with_extension("part");
    let write_err = |path: &Path, e: std::io::Error| AssetResolveError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = fs::File::create(&staged).map_err(|e| write_err(&staged, e))?;
    let mut written: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(|e| write_err(&staged, e))?;
        written += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(written, total);
        }
    }
    file.flush().map_err(|e| write_err(&staged, e))?;
    drop(file);

    fs::rename(&staged, dest).map_err(|e| write_err(dest, e))
}
