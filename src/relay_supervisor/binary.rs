//! Relay executable resolution
//!
//! Lookup order: bundled path, then `PATH`, then a download of the release
//! asset matching the host OS/architecture into the data directory.

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Executable base name
pub const RELAY_BINARY_NAME: &str = "go2rtc";

/// How the executable was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinarySource {
    Bundled(PathBuf),
    SystemPath(PathBuf),
    Downloaded(PathBuf),
}

impl BinarySource {
    pub fn path(&self) -> &Path {
        match self {
            BinarySource::Bundled(p) | BinarySource::SystemPath(p) | BinarySource::Downloaded(p) => p,
        }
    }
}

/// Release asset for an OS/architecture pair (`std::env::consts` names)
pub fn release_asset(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Some("go2rtc_linux_amd64"),
        ("linux", "aarch64") => Some("go2rtc_linux_arm64"),
        ("linux", "arm") => Some("go2rtc_linux_arm"),
        ("linux", "x86") => Some("go2rtc_linux_i386"),
        ("linux", "mips") => Some("go2rtc_linux_mipsel"),
        ("macos", "x86_64") => Some("go2rtc_mac_amd64.zip"),
        ("macos", "aarch64") => Some("go2rtc_mac_arm64.zip"),
        ("windows", "x86_64") => Some("go2rtc_win64.zip"),
        ("windows", "x86") => Some("go2rtc_win32.zip"),
        ("windows", "aarch64") => Some("go2rtc_win_arm64.zip"),
        _ => None,
    }
}

fn executable_name() -> String {
    if cfg!(windows) {
        format!("{}.exe", RELAY_BINARY_NAME)
    } else {
        RELAY_BINARY_NAME.to_string()
    }
}

/// Find an executable by name on `PATH`
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Resolve the relay executable, downloading it if necessary
pub async fn resolve_binary(config: &RelayConfig) -> Result<BinarySource> {
    if config.binary_path.is_file() {
        return Ok(BinarySource::Bundled(config.binary_path.clone()));
    }

    let name = executable_name();
    if let Some(path) = find_in_path(&name) {
        return Ok(BinarySource::SystemPath(path));
    }

    let target = config.data_dir.join(&name);
    if target.is_file() {
        return Ok(BinarySource::Downloaded(target));
    }

    download_binary(config, &target).await?;
    Ok(BinarySource::Downloaded(target))
}

async fn download_binary(config: &RelayConfig, target: &Path) -> Result<()> {
    let (os, arch) = (std::env::consts::OS, std::env::consts::ARCH);
    let asset = release_asset(os, arch).ok_or_else(|| {
        Error::Config(format!("No relay release for platform {}/{}", os, arch))
    })?;

    let url = format!("{}/{}", config.release_url.trim_end_matches('/'), asset);
    tracing::info!(url = %url, target = %target.display(), "Downloading relay executable");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;
    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(Error::Config(format!(
            "Relay download failed: {} {}",
            url,
            resp.status()
        )));
    }
    let bytes = resp.bytes().await?.to_vec();

    let executable = if asset.ends_with(".zip") {
        tokio::task::spawn_blocking(move || extract_from_zip(&bytes))
            .await
            .map_err(|e| Error::Internal(format!("Archive extraction panicked: {}", e)))??
    } else {
        bytes
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(target, &executable).await?;
    mark_executable(target).await?;

    tracing::info!(
        target = %target.display(),
        size = executable.len(),
        "Relay executable installed"
    );

    Ok(())
}

/// Pull the relay executable out of a release archive
fn extract_from_zip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Config(format!("Invalid relay archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Config(format!("Invalid relay archive entry: {}", e)))?;
        let is_binary = entry
            .name()
            .rsplit('/')
            .next()
            .map(|n| n.starts_with(RELAY_BINARY_NAME))
            .unwrap_or(false);
        if entry.is_file() && is_binary {
            let mut out = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut out)?;
            return Ok(out);
        }
    }

    Err(Error::Config("Relay archive contains no executable".to_string()))
}

#[cfg(unix)]
async fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
