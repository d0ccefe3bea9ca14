// tests/common/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use lwe_secure_link::utils::config::Config;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";

struct Authority {
    cert: Certificate,
    key: KeyPair,
}

impl Authority {
    fn new(name: &str) -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, name);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::CrlSign,
        ];
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    fn issue(&self, name: &str, usage: ExtendedKeyUsagePurpose) -> (String, String) {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, name);
        params.extended_key_usages = vec![usage];
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (cert.pem(), key.serialize_pem())
    }
}

/// Throwaway CA plus server and client identities written to a temp directory.
pub struct TestPki {
    pub dir: TempDir,
    pub ca_path: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    /// A client identity issued by an authority the server does not trust.
    pub rogue_cert: PathBuf,
    pub rogue_key: PathBuf,
}

impl TestPki {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ca = Authority::new("lwe test ca");
        let rogue_ca = Authority::new("rogue ca");

        let write = |name: &str, contents: &str| {
            let path = dir.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        };

        let ca_path = write("ca.crt", &ca.cert.pem());
        let (cert, key) = ca.issue("server", ExtendedKeyUsagePurpose::ServerAuth);
        let server_cert = write("server.crt", &cert);
        let server_key = write("server.key", &key);
        let (cert, key) = ca.issue("client", ExtendedKeyUsagePurpose::ClientAuth);
        let client_cert = write("client.crt", &cert);
        let client_key = write("client.key", &key);
        let (cert, key) = rogue_ca.issue("rogue", ExtendedKeyUsagePurpose::ClientAuth);
        let rogue_cert = write("rogue.crt", &cert);
        let rogue_key = write("rogue.key", &key);

        Self {
            dir,
            ca_path,
            server_cert,
            server_key,
            client_cert,
            client_key,
            rogue_cert,
            rogue_key,
        }
    }

    pub fn server_config(&self, key_scope: &str) -> Config {
        self.config(
            "server.toml",
            &self.server_cert,
            &self.server_key,
            SECRET,
            key_scope,
            "localhost:65432",
        )
    }

    pub fn client_config(&self, server_address: &str, secret: &str) -> Config {
        self.client_config_with(server_address, secret, &self.client_cert, &self.client_key)
    }

    pub fn client_config_with(&self, server_address: &str, secret: &str, cert: &Path, key: &Path) -> Config {
        self.config("client.toml", cert, key, secret, "shared", server_address)
    }

    fn config(&self, name: &str, cert: &Path, key: &Path, secret: &str, key_scope: &str, server_address: &str) -> Config {
        let body = format!(
            r#"
[lattice]
n = 64
stddev = 0.5
key_scope = "{key_scope}"

[network]
listen_address = "127.0.0.1:0"
server_address = "{server_address}"

[tls]
cert_path = '{cert}'
key_path = '{key}'
peer_cert_path = '{ca}'
server_name = "localhost"

[auth]
secret = "{secret}"
"#,
            key_scope = key_scope,
            server_address = server_address,
            cert = cert.display(),
            key = key.display(),
            ca = self.ca_path.display(),
            secret = secret,
        );
        let path = self.dir.path().join(name);
        fs::write(&path, body).unwrap();
        Config::from_file(&path).unwrap()
    }
}
