//! Shared fixtures: a throwaway PKI and a scripted FOG server

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

use fog_agent::auth::{AUTHORIZE_ENDPOINT, CERTIFICATE_ENDPOINT};
use fog_agent::{CommOptions, Communicator, HttpBackend, HttpError, PinnedCa};
use fog_core::config::ServerConfig;
use fog_core::{FixedMacProvider, TokenStore, UserKeyProtector};
use fog_protocol::{envelope, EnvelopeKind, SessionKey, SESSION_KEY_LEN};

pub const MACS: &str = "AA:BB:CC:DD:EE:FF";
pub const BASE: &str = "http://fog.test/fog";

/// A CA, a server certificate it issued, an expired one it issued, and one
/// issued by an impostor
pub struct Pki {
    pub ca_pem: String,
    pub server_cert_pem: String,
    pub server_key: RsaPrivateKey,
    pub rogue_cert_pem: String,
    pub expired_cert_pem: String,
}

fn ca(name: &str) -> (rcgen::Certificate, KeyPair) {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("ca params");
    params.distinguished_name.push(DnType::CommonName, name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let key = KeyPair::generate().expect("ca key");
    let cert = params.self_signed(&key).expect("self-signed ca");
    (cert, key)
}

fn leaf_params() -> CertificateParams {
    let mut params = CertificateParams::new(vec!["fog.test".to_string()]).expect("leaf params");
    params.distinguished_name.push(DnType::CommonName, "fog.test");
    params
}

fn leaf(key: &KeyPair, issuer: &rcgen::Certificate, issuer_key: &KeyPair) -> String {
    sign(leaf_params(), key, issuer, issuer_key)
}

fn sign(
    params: CertificateParams,
    key: &KeyPair,
    issuer: &rcgen::Certificate,
    issuer_key: &KeyPair,
) -> String {
    params
        .signed_by(key, issuer, issuer_key)
        .expect("signed leaf")
        .pem()
}

/// Generated once per test binary; RSA key generation is slow
pub fn pki() -> &'static Pki {
    static PKI: OnceLock<Pki> = OnceLock::new();
    PKI.get_or_init(|| {
        let server_key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("rsa key");
        let pem = server_key.to_pkcs8_pem(LineEnding::LF).expect("pkcs8 pem");
        let leaf_key = KeyPair::from_pem(&pem).expect("rcgen rsa key");

        let (ca_cert, ca_key) = ca("FOG Test CA");
        // Same subject, different key: only the signature tells them apart
        let (rogue_cert, rogue_key) = ca("FOG Test CA");

        let mut expired = leaf_params();
        expired.not_before = rcgen::date_time_ymd(2000, 1, 1);
        expired.not_after = rcgen::date_time_ymd(2001, 1, 1);

        Pki {
            ca_pem: ca_cert.pem(),
            server_cert_pem: leaf(&leaf_key, &ca_cert, &ca_key),
            server_key,
            rogue_cert_pem: leaf(&leaf_key, &rogue_cert, &rogue_key),
            expired_cert_pem: sign(expired, &leaf_key, &ca_cert, &ca_key),
        }
    })
}

/// How the scripted server answers `sub=authorize`
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Accept the key and issue this token
    Accept { token: Vec<u8> },
    /// Answer with this bare return code
    Reject(&'static str),
}

/// Which certificate the scripted server hands out
#[derive(Debug, Clone, Copy)]
pub enum ServedCert {
    /// Issued by the pinned CA, currently valid
    Trusted,
    /// Same issuer name, signed by a different key
    Rogue,
    /// Issued by the pinned CA, validity ended in 2001
    Expired,
}

/// A scripted service reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Sent as-is
    Plain(String),
    /// Sealed under the key negotiated during the last accepted authentication
    Sealed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(String),
    Post(String, Vec<(String, String)>),
}

impl Request {
    pub fn url(&self) -> &str {
        match self {
            Request::Get(url) | Request::Post(url, _) => url,
        }
    }
}

struct State {
    requests: Vec<Request>,
    replies: VecDeque<Reply>,
    auth: AuthMode,
    served_cert: ServedCert,
    offline: bool,
    session_key: Option<SessionKey>,
    received_tokens: Vec<Vec<u8>>,
}

/// In-process stand-in for the FOG web server
#[derive(Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                requests: Vec::new(),
                replies: VecDeque::new(),
                auth: AuthMode::Accept {
                    token: b"server-token-1".to_vec(),
                },
                served_cert: ServedCert::Trusted,
                offline: false,
                session_key: None,
                received_tokens: Vec::new(),
            })),
        }
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.state.lock().replies.push_back(reply);
        self
    }

    pub fn set_auth(&self, mode: AuthMode) {
        self.state.lock().auth = mode;
    }

    pub fn serve_cert(&self, cert: ServedCert) {
        self.state.lock().served_cert = cert;
    }

    pub fn go_offline(&self) {
        self.state.lock().offline = true;
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    pub fn posts(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, Request::Post(..)))
            .collect()
    }

    /// GETs that are neither certificate downloads nor registrations
    pub fn service_gets(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Get(url)
                    if !url.contains(CERTIFICATE_ENDPOINT) && !url.contains("register.php") =>
                {
                    Some(url)
                }
                _ => None,
            })
            .collect()
    }

    /// Tokens the client presented, decrypted
    pub fn received_tokens(&self) -> Vec<Vec<u8>> {
        self.state.lock().received_tokens.clone()
    }

    pub fn session_key(&self) -> Option<SessionKey> {
        self.state.lock().session_key.clone()
    }

    fn authorize(&self, form: &[(&str, &str)]) -> Result<Vec<u8>, HttpError> {
        let field = |name: &str| {
            form.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        };
        let unwrap = |hex_value: String| {
            let sealed = hex::decode(hex_value).expect("hex field");
            pki()
                .server_key
                .decrypt(Pkcs1v15Encrypt, &sealed)
                .expect("rsa decrypt")
        };

        let mut state = self.state.lock();
        let token = unwrap(field("token"));
        state.received_tokens.push(token);

        match state.auth.clone() {
            AuthMode::Reject(code) => Ok(code.as_bytes().to_vec()),
            AuthMode::Accept { token } => {
                let raw_key = unwrap(field("sym_key"));
                let bytes: [u8; SESSION_KEY_LEN] = raw_key.try_into().expect("32 byte key");
                let key = SessionKey::from_bytes(bytes);
                let body = format!("#!ok\n#token={}", hex::encode(&token));
                let sealed = envelope::encode(&body, &key, EnvelopeKind::KeyExchange)
                    .expect("seal auth reply");
                state.session_key = Some(key);
                Ok(sealed.into_bytes())
            }
        }
    }
}

impl HttpBackend for FakeServer {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let mut state = self.state.lock();
        state.requests.push(Request::Get(url.to_string()));
        if state.offline {
            return Err(HttpError::Request("connection refused".to_string()));
        }

        if url.contains(CERTIFICATE_ENDPOINT) {
            let pem = match state.served_cert {
                ServedCert::Trusted => &pki().server_cert_pem,
                ServedCert::Rogue => &pki().rogue_cert_pem,
                ServedCert::Expired => &pki().expired_cert_pem,
            };
            return Ok(pem.clone().into_bytes());
        }
        if url.contains("register.php") {
            return Ok(b"#!ok".to_vec());
        }

        let body = match state.replies.pop_front() {
            None => "#!ok".to_string(),
            Some(Reply::Plain(body)) => body,
            Some(Reply::Sealed(body)) => {
                let key = state.session_key.as_ref().expect("no session negotiated");
                envelope::encode(&body, key, EnvelopeKind::Encrypted).expect("seal reply")
            }
        };
        Ok(body.into_bytes())
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Vec<u8>, HttpError> {
        {
            let mut state = self.state.lock();
            state.requests.push(Request::Post(
                url.to_string(),
                form.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));
            if state.offline {
                return Err(HttpError::Request("connection refused".to_string()));
            }
        }

        if url.ends_with(AUTHORIZE_ENDPOINT) {
            return self.authorize(form);
        }
        Ok(b"#!ok".to_vec())
    }
}

/// Token store rooted in `dir`
pub fn token_store(dir: &Path) -> TokenStore {
    TokenStore::new(
        dir.join("token.dat"),
        UserKeyProtector::new(dir.join("token.key")),
    )
}

/// A communicator wired to `server`, address resolved, state under `dir`
pub fn communicator(server: &FakeServer, dir: &Path, max_auth_retries: u32) -> Communicator {
    let options = CommOptions {
        max_auth_retries,
        server_cert_path: dir.join("tmp").join("public.crt"),
    };
    let ca = PinnedCa::from_bytes(pki().ca_pem.clone()).expect("pinned ca");
    let comm = Communicator::new(server.clone(), token_store(dir), ca, options)
        .with_mac_provider(FixedMacProvider::new(MACS));
    assert!(comm.resolve_address(&ServerConfig::new(false, "fog.test", "/fog")));
    comm
}
