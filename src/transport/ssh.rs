//! SSH transport implementation using russh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use super::Transport;
use crate::error::{Result, TransportError};

/// An established, authenticated SSH connection.
///
/// Convert into an interactive shell with [`into_shell`](Self::into_shell).
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<ClientHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = ClientHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout(config.timeout))?
        .map_err(|e| {
            // If check_server_key stored a detailed error, use that instead
            // of the generic russh::Error::UnknownKey
            if let Some(hk_err) = host_key_error.lock().unwrap().take() {
                hk_err
            } else {
                TransportError::Ssh(e)
            }
        })?;

        Self::authenticate(&mut session, &config).await?;

        Ok(Self { session, config })
    }

    /// Open a PTY shell channel on this connection and hand over ownership.
    pub async fn into_shell(self) -> Result<SshShell> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(SshShell {
            session: self.session,
            channel,
            open: true,
        })
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<ClientHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                // Best RSA hash algorithm the server supports
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Interactive PTY shell over an SSH connection.
///
/// This is the production [`Transport`]: lines out, raw terminal chunks in.
pub struct SshShell {
    session: Handle<ClientHandler>,
    channel: Channel<Msg>,
    open: bool,
}

impl SshShell {
    /// Connect, authenticate, and open the interactive shell in one step.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        SshTransport::connect(config).await?.into_shell().await
    }
}

impl Transport for SshShell {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.open {
            return Err(TransportError::Disconnected.into());
        }

        let mut payload = Vec::with_capacity(line.len() + 1);
        payload.extend_from_slice(line.as_bytes());
        payload.push(b'\n');

        self.channel
            .data(&payload[..])
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn read_some(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        if !self.open {
            return Err(TransportError::Disconnected.into());
        }

        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            match tokio::time::timeout(remaining, self.channel.wait()).await {
                // Quiet for the full wait
                Err(_) => return Ok(None),

                // Channel closed underneath us
                Ok(None) => {
                    self.open = false;
                    return Err(TransportError::Disconnected.into());
                }

                Ok(Some(ChannelMsg::Data { data })) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }

                // Window adjustments, exit status, etc. — keep waiting
                Ok(Some(_)) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        if let Err(e) = self.channel.eof().await {
            debug!("channel eof on close: {}", e);
        }
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// SSH client handler for russh.
struct ClientHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<std::path::PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl ClientHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if the key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    // Unknown host — learn the key
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => {
                    // Key changed — store detailed error and reject
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    *self.host_key_error.lock().unwrap() =
                        Some(TransportError::HostKeyUnknown {
                            host: self.host.clone(),
                            port: self.port,
                        });
                    Ok(false)
                }
                Err(e) => {
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },
        }
    }
}
