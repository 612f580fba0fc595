//! Plain FTP destination
//!
//! `STOR` does not carry a modification time, so listing asks the server for
//! each artifact's `MDTM` (one round trip per entry).

use super::{
    artifact_basename, is_artifact_name, sort_oldest_first, upload_via_partial, ArtifactMetadata,
    Result, Transport, TransportError, TransportKind,
};
use crate::config::RemoteConfig;
use std::fs::File;
use std::net::ToSocketAddrs;
use std::path::Path;
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Status};
use tracing::{debug, info, warn};

pub struct FtpTransport {
    stream: FtpStream,
    host: String,
}

impl FtpTransport {
    /// Connect, log in, switch to binary mode and enter `directory`
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

        debug!("Connecting to ftp://{}", host);
        let mut stream =
            FtpStream::connect_timeout(addr, timeout).map_err(|e| connect_err(e.to_string()))?;
        stream
            .get_ref()
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.get_ref().set_write_timeout(Some(timeout)))
            .map_err(|e| connect_err(e.to_string()))?;

        stream
            .login(&remote.user, &remote.password)
            .map_err(|e| TransportError::Auth {
                user: remote.user.clone(),
                host: host.clone(),
                reason: e.to_string(),
            })?;

        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| connect_err(e.to_string()))?;

        let mut transport = Self { stream, host };
        transport.enter_directory(directory)?;
        info!("Connected to ftp://{}/{}", transport.host, directory.trim_start_matches('/'));
        Ok(transport)
    }

    /// `CWD` into the destination, creating it first if the server refuses
    fn enter_directory(&mut self, directory: &str) -> Result<()> {
        if self.stream.cwd(directory).is_ok() {
            return Ok(());
        }

        debug!("Creating remote directory {}", directory);
        let mut path = String::new();
        if directory.starts_with('/') {
            path.push('/');
        }
        for component in directory.split('/').filter(|c| !c.is_empty()) {
            path.push_str(component);
            // Already existing components fail MKD; the final CWD decides
            let _ = self.stream.mkdir(&path);
            path.push('/');
        }

        self.stream
            .cwd(directory)
            .map_err(|e| TransportError::Directory {
                path: directory.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Transport for FtpTransport {
    fn upload(&mut self, local_artifact: &Path) -> Result<()> {
        let name = artifact_basename(local_artifact)?;
        let upload_err = |reason: String| TransportError::Upload {
            name: name.clone(),
            reason,
        };
        let mut file = File::open(local_artifact)?;

        upload_via_partial(
            self,
            &name,
            |transport, partial| {
                let bytes = transport
                    .stream
                    .put_file(partial, &mut file)
                    .map_err(|e| upload_err(e.to_string()))?;
                debug!("Stored {} ({} bytes) on {}", partial, bytes, transport.host);
                Ok(())
            },
            |transport, partial, target| {
                transport
                    .stream
                    .rename(partial, target)
                    .map_err(|e| upload_err(format!("renaming into place: {}", e)))
            },
            |transport, partial| {
                transport
                    .stream
                    .rm(partial)
                    .map_err(|e| upload_err(e.to_string()))
            },
        )
    }

    fn list(&mut self) -> Result<Vec<ArtifactMetadata>> {
        let names = self
            .stream
            .nlst(None)
            .map_err(|e| TransportError::List(e.to_string()))?;

        let mut artifacts = Vec::new();
        for entry in names {
            // Some servers answer NLST with paths
            let name = entry.rsplit('/').next().unwrap_or(&entry).to_string();
            if !is_artifact_name(&name) {
                continue;
            }

            let modified = self
                .stream
                .mdtm(&name)
                .map_err(|e| TransportError::List(format!("MDTM {}: {}", name, e)))?;
            artifacts.push(ArtifactMetadata::new(name, modified.and_utc()));
        }

        sort_oldest_first(&mut artifacts);
        Ok(artifacts)
    }

    fn delete(&mut self, name: &str) -> Result<()> {
        self.stream.rm(name).map_err(|e| match e {
            FtpError::UnexpectedResponse(ref response)
                if response.status == Status::FileUnavailable =>
            {
                TransportError::NotFound(name.to_string())
            }
            other => TransportError::Delete {
                name: name.to_string(),
                reason: other.to_string(),
            },
        })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Ftp
    }
}

impl Drop for FtpTransport {
    fn drop(&mut self) {
        match self.stream.quit() {
            Ok(()) => debug!("Closed ftp connection to {}", self.host),
            Err(e) => warn!("Failed to close ftp connection to {}: {}", self.host, e),
        }
    }
}
