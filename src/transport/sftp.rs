//! SFTP destination over ssh2
//!
//! Uploads carry the local file's mtime, so listing can order artifacts by
//! the stat returned alongside each directory entry.

use super::{
    artifact_basename, is_artifact_name, sort_oldest_first, upload_via_partial, ArtifactMetadata,
    Result, Transport, TransportError, TransportKind,
};
use crate::config::RemoteConfig;
use chrono::{DateTime, Utc};
use ssh2::{CheckResult, FileStat, KnownHostFileKind, Session, Sftp};
use std::fs::File;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// libssh2 status for "no such file" on SFTP operations
const SFTP_NO_SUCH_FILE: i32 = 2;

pub struct SftpTransport {
    sftp: Sftp,
    session: Session,
    directory: PathBuf,
    host: String,
}

impl SftpTransport {
    /// Connect, verify the host key, authenticate and ensure `directory` exists
    pub fn connect(remote: &RemoteConfig, directory: &str, timeout: Duration) -> Result<Self> {
        let host = format!("{}:{}", remote.host, remote.effective_port());
        let connect_err = |reason: String| TransportError::Connect {
            host: host.clone(),
            reason,
        };

        let addr = host
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("host did not resolve".to_string()))?;

        debug!("Connecting to sftp://{}", host);
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| connect_err(e.to_string()))?;

        let mut session = Session::new().map_err(|e| connect_err(e.to_string()))?;
        session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| connect_err(e.to_string()))?;

        verify_host_key(&session, remote, &host)?;

        session
            .userauth_password(&remote.user, &remote.password)
            .map_err(|e| TransportError::Auth {
                user: remote.user.clone(),
                host: host.clone(),
                reason: e.to_string(),
            })?;
        if !session.authenticated() {
            return Err(TransportError::Auth {
                user: remote.user.clone(),
                host: host.clone(),
                reason: "server rejected credentials".to_string(),
            });
        }

        let sftp = session.sftp().map_err(|e| connect_err(e.to_string()))?;
        let directory = PathBuf::from(directory);
        ensure_remote_dir(&sftp, &directory).map_err(|e| TransportError::Directory {
            path: directory.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Connected to sftp://{}{}", host, directory.display());
        Ok(Self {
            sftp,
            session,
            directory,
            host,
        })
    }
}

fn verify_host_key(session: &Session, remote: &RemoteConfig, host: &str) -> Result<()> {
    let Some(ref known_hosts_file) = remote.known_hosts else {
        if remote.insecure_skip_host_key {
            warn!("Host key verification for {} is disabled by configuration", host);
            return Ok(());
        }
        return Err(TransportError::HostKey {
            host: host.to_string(),
            reason: "no known_hosts file configured".to_string(),
        });
    };

    let host_key_err = |reason: String| TransportError::HostKey {
        host: host.to_string(),
        reason,
    };

    let mut known_hosts = session.known_hosts().map_err(|e| host_key_err(e.to_string()))?;
    known_hosts
        .read_file(known_hosts_file, KnownHostFileKind::OpenSSH)
        .map_err(|e| host_key_err(format!("{}: {}", known_hosts_file.display(), e)))?;

    let (key, _) = session
        .host_key()
        .ok_or_else(|| host_key_err("server presented no host key".to_string()))?;

    let port = remote.effective_port();
    let result = if port == 22 {
        known_hosts.check(&remote.host, key)
    } else {
        known_hosts.check_port(&remote.host, port, key)
    };

    match result {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(host_key_err("host key does not match known_hosts".to_string())),
        CheckResult::NotFound => Err(host_key_err("host not present in known_hosts".to_string())),
        CheckResult::Failure => Err(host_key_err("host key check failed".to_string())),
    }
}

/// mkdir -p over sftp
fn ensure_remote_dir(sftp: &Sftp, directory: &Path) -> std::result::Result<(), ssh2::Error> {
    if sftp.stat(directory).is_ok() {
        return Ok(());
    }

    let mut current = PathBuf::new();
    for component in directory.components() {
        current.push(component);
        if sftp.stat(&current).is_err() {
            debug!("Creating remote directory {}", current.display());
            sftp.mkdir(&current, 0o755)?;
        }
    }
    Ok(())
}

fn unix_seconds(time: std::time::SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl Transport for SftpTransport {
    fn upload(&mut self, local_artifact: &Path) -> Result<()> {
        let name = artifact_basename(local_artifact)?;
        let upload_err = |reason: String| TransportError::Upload {
            name: name.clone(),
            reason,
        };

        let metadata = std::fs::metadata(local_artifact)?;
        let mut local = File::open(local_artifact)?;
        // Keep the local mtime; listing orders by it
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: None,
            atime: Some(unix_seconds(metadata.accessed()?)),
            mtime: Some(unix_seconds(metadata.modified()?)),
        };

        upload_via_partial(
            self,
            &name,
            |transport, partial| {
                let remote_path = transport.directory.join(partial);
                let mut remote = transport
                    .sftp
                    .create(&remote_path)
                    .map_err(|e| upload_err(e.to_string()))?;
                let bytes =
                    io::copy(&mut local, &mut remote).map_err(|e| upload_err(e.to_string()))?;
                drop(remote);

                transport
                    .sftp
                    .setstat(&remote_path, stat)
                    .map_err(|e| upload_err(format!("setting mtime: {}", e)))?;
                debug!("Uploaded {} ({} bytes) to {}", partial, bytes, transport.host);
                Ok(())
            },
            |transport, partial, target| {
                transport
                    .sftp
                    .rename(
                        &transport.directory.join(partial),
                        &transport.directory.join(target),
                        None,
                    )
                    .map_err(|e| upload_err(format!("renaming into place: {}", e)))
            },
            |transport, partial| {
                transport
                    .sftp
                    .unlink(&transport.directory.join(partial))
                    .map_err(|e| upload_err(e.to_string()))
            },
        )
    }

    fn list(&mut self) -> Result<Vec<ArtifactMetadata>> {
        let entries = self
            .sftp
            .readdir(&self.directory)
            .map_err(|e| TransportError::List(e.to_string()))?;

        let mut artifacts = Vec::new();
        for (path, stat) in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_artifact_name(name) || !stat.is_file() {
                continue;
            }

            let mtime = stat.mtime.unwrap_or(0);
            let modified = DateTime::<Utc>::from_timestamp(mtime as i64, 0)
                .ok_or_else(|| TransportError::List(format!("{}: invalid mtime {}", name, mtime)))?;
            artifacts.push(ArtifactMetadata::new(name, modified));
        }

        sort_oldest_first(&mut artifacts);
        Ok(artifacts)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.sftp
            .unlink(&self.directory.join(name))
            .map_err(|e| match e.code() {
                ssh2::ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => TransportError::NotFound(name.to_string()),
                _ => TransportError::Delete {
                    name: name.to_string(),
                    reason: e.to_string(),
                },
            })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sftp
    }
}

impl Drop for SftpTransport {
    fn drop(&mut self) {
        match self.session.disconnect(None, "bcupper done", None) {
            Ok(()) => debug!("Closed sftp connection to {}", self.host),
            Err(e) => warn!("Failed to close sftp connection to {}: {}", self.host, e),
        }
    }
}
