#![forbid(unsafe_code)]

//! Server identity records and bridge lines.
//!
//! A server's private identity is persisted as a line-oriented UTF-8 file:
//! a magic banner, the nickname, the literal `host:port` endpoint, the
//! 64-hex-char private key, then `key=value` parameters. The public identity
//! is the same record minus the private key, plus the derived public key,
//! and renders to a [`BridgeLine`] clients can be configured from.
//!
//! Addresses are parsed without any name resolution: a record must name a
//! literal IP so loading it can never leak the endpoint to a resolver.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::path::Path;

use tracing::info;

use crate::error::{CoreResult, IdentityError};
use crate::keys::{PrivateKey, PublicKey};
use crate::params::{
    check_unacked, CryptingParams, DEFAULT_MTU, PARAM_MODEL, PARAM_MTU, PARAM_PUBLIC_KEY,
};

/// First line of every private identity file.
pub const MAGIC_LINE: &str = "!!veil-server-private-v1!!";

/// Traffic-model selection: a model name plus its sub-parameters.
///
/// In a parameter bag the model lives under a top key (`m`) with sub-keys
/// spelled `m.<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub params: BTreeMap<String, String>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: BTreeMap::new() }
    }

    /// Pull the model name and every `<top_key>.<suffix>` entry out of a bag.
    pub fn extract(
        params: &BTreeMap<String, String>,
        acked: &mut BTreeSet<String>,
        top_key: &str,
    ) -> CoreResult<Self> {
        let name = params.get(top_key).ok_or(IdentityError::Missing("model name"))?;
        if name.is_empty() {
            return Err(IdentityError::Invalid("model name"));
        }
        acked.insert(top_key.to_string());

        let prefix = format!("{top_key}.");
        let mut model_params = BTreeMap::new();
        for (key, value) in params {
            if let Some(suffix) = key.strip_prefix(&prefix) {
                model_params.insert(suffix.to_string(), value.clone());
                acked.insert(key.clone());
            }
        }

        Ok(Self { name: name.clone(), params: model_params })
    }

    /// Inverse of [`ModelSpec::extract`].
    pub fn insert_into(&self, params: &mut BTreeMap<String, String>, top_key: &str) {
        params.insert(top_key.to_string(), self.name.clone());
        for (suffix, value) in &self.params {
            params.insert(format!("{top_key}.{suffix}"), value.clone());
        }
    }
}

/// Parse a `host:port` endpoint with a literal IP host.
///
/// Never performs name resolution; IPv6 hosts must be bracketed.
pub fn parse_endpoint_addr(text: &str) -> CoreResult<SocketAddr> {
    text.parse::<SocketAddr>().map_err(|_| IdentityError::Invalid("network address"))
}

/// Single-record client configuration for reaching a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLine {
    pub nickname: String,
    pub address: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EndpointConfig {
    addr: SocketAddr,
    model: ModelSpec,
    crypting: CryptingParams,
}

fn load_endpoint_config(
    address: &str,
    params: &BTreeMap<String, String>,
    acked: &mut BTreeSet<String>,
) -> CoreResult<EndpointConfig> {
    let addr = parse_endpoint_addr(address)?;
    let model = ModelSpec::extract(params, acked, PARAM_MODEL)?;
    let crypting = CryptingParams::from_params(params, acked)?;
    Ok(EndpointConfig { addr, model, crypting })
}

/// Public identity of a server: everything a client needs to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPublic {
    nickname: String,
    endpoint: EndpointConfig,
    public_key: PublicKey,
}

impl ServerPublic {
    pub fn new(
        nickname: impl Into<String>,
        addr: SocketAddr,
        model: ModelSpec,
        crypting: CryptingParams,
        public_key: PublicKey,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            endpoint: EndpointConfig { addr, model, crypting },
            public_key,
        }
    }

    /// Convert bridge-line parameters into a public identity.
    pub fn from_bridge_line(bline: &BridgeLine) -> CoreResult<Self> {
        let mut acked = BTreeSet::new();
        let endpoint = load_endpoint_config(&bline.address, &bline.params, &mut acked)?;

        let key_text = bline
            .params
            .get(PARAM_PUBLIC_KEY)
            .ok_or(IdentityError::Missing("public key"))?;
        let public_key = PublicKey::from_hex(key_text)?;
        acked.insert(PARAM_PUBLIC_KEY.to_string());

        check_unacked(&bline.params, &acked)?;

        Ok(Self { nickname: bline.nickname.clone(), endpoint, public_key })
    }

    /// Render a bridge line. The `mtu` parameter is emitted only when it
    /// differs from the default.
    pub fn bridge_line(&self) -> BridgeLine {
        let mut params = BTreeMap::new();
        params.insert(PARAM_PUBLIC_KEY.to_string(), self.public_key.to_hex());
        if self.endpoint.crypting.mtu != DEFAULT_MTU {
            params.insert(PARAM_MTU.to_string(), self.endpoint.crypting.mtu.to_string());
        }
        self.endpoint.model.insert_into(&mut params, PARAM_MODEL);

        BridgeLine {
            nickname: self.nickname.clone(),
            address: self.endpoint.addr.to_string(),
            params,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn addr(&self) -> SocketAddr {
        self.endpoint.addr
    }

    pub fn model(&self) -> &ModelSpec {
        &self.endpoint.model
    }

    pub fn crypting(&self) -> CryptingParams {
        self.endpoint.crypting
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

/// Private identity of a server, as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPrivate {
    nickname: String,
    endpoint: EndpointConfig,
    private_key: PrivateKey,
}

impl ServerPrivate {
    pub fn new(
        nickname: impl Into<String>,
        addr: SocketAddr,
        model: ModelSpec,
        crypting: CryptingParams,
        private_key: PrivateKey,
    ) -> Self {
        Self {
            nickname: nickname.into(),
            endpoint: EndpointConfig { addr, model, crypting },
            private_key,
        }
    }

    /// Create a fresh identity with a newly generated key and default
    /// crypting parameters.
    pub fn generate(
        nickname: impl Into<String>,
        address: &str,
        model: ModelSpec,
    ) -> CoreResult<Self> {
        if model.name.is_empty() {
            return Err(IdentityError::Invalid("model name"));
        }
        let addr = parse_endpoint_addr(address)?;
        Ok(Self {
            nickname: nickname.into(),
            endpoint: EndpointConfig { addr, model, crypting: CryptingParams::default() },
            private_key: PrivateKey::generate(),
        })
    }

    pub fn public(&self) -> ServerPublic {
        ServerPublic {
            nickname: self.nickname.clone(),
            endpoint: self.endpoint.clone(),
            public_key: self.private_key.public(),
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn addr(&self) -> SocketAddr {
        self.endpoint.addr
    }

    pub fn model(&self) -> &ModelSpec {
        &self.endpoint.model
    }

    pub fn crypting(&self) -> CryptingParams {
        self.endpoint.crypting
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Load a private identity file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let file = fs::File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        match lines.next().transpose()? {
            Some(line) if line == MAGIC_LINE => {}
            _ => return Err(IdentityError::Missing("magic line")),
        }

        let nickname = lines.next().transpose()?.ok_or(IdentityError::Syntax)?;

        let addr_line = lines
            .next()
            .transpose()?
            .ok_or(IdentityError::Missing("network address"))?;
        let addr = parse_endpoint_addr(&addr_line)?;

        let key_line = lines
            .next()
            .transpose()?
            .ok_or(IdentityError::Missing("private key"))?;
        let private_key = PrivateKey::from_hex(&key_line)?;

        let mut params = BTreeMap::new();
        for line in lines {
            let line = line?;
            let (key, value) = line.split_once('=').ok_or(IdentityError::Syntax)?;
            params.insert(key.to_string(), value.to_string());
        }

        let mut acked = BTreeSet::new();
        let model = ModelSpec::extract(&params, &mut acked, PARAM_MODEL)?;
        let crypting = CryptingParams::from_params(&params, &mut acked)?;
        check_unacked(&params, &acked)?;

        Ok(Self {
            nickname,
            endpoint: EndpointConfig { addr, model, crypting },
            private_key,
        })
    }

    /// Save this identity to a new file at `path`.
    ///
    /// The file must not already exist. It is opened create-exclusive with
    /// mode 0600, written, and fsynced; on any failure in between, the
    /// partial file is unlinked. The public key is never written; it is
    /// re-derived from the private key on load.
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> CoreResult<()> {
        let path = path.as_ref();

        let key_hex = self.private_key.to_hex();
        let addr_text = self.endpoint.addr.to_string();
        let header: [&str; 4] = [MAGIC_LINE, &self.nickname, &addr_text, &key_hex];

        let mut content = String::new();
        for line in header {
            if line.contains(['\r', '\n']) {
                return Err(IdentityError::Syntax);
            }
            content.push_str(line);
            content.push('\n');
        }

        for (key, value) in &self.public().bridge_line().params {
            if key == PARAM_PUBLIC_KEY {
                continue;
            }
            if key.contains(['\r', '\n']) || value.contains(['\r', '\n']) {
                return Err(IdentityError::Syntax);
            }
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        let written = file
            .write_all(content.as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);
        if let Err(err) = written {
            let _ = fs::remove_file(path);
            return Err(err.into());
        }

        info!(path = %path.display(), "saved server identity");
        Ok(())
    }
}
