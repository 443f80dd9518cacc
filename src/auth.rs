//! Authorization support: the `~/.sane/pass` credential store and the
//! MD5-salted password encoding demanded by some backends.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::error::{Result, SaneError};
use crate::net::wire::string_to_latin1;

/// Marker a backend appends to an authorization resource to request a
/// salted credential: `<backend>$MD5$<salt>`.
pub const MD5_MARKER: &str = "$MD5$";

/// One `user:password:backend` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub backend: String,
}

/// Source of credentials for authorization resources.
pub trait PasswordProvider {
    /// Look up the credential for a resource name, `None` if unknown.
    fn lookup(&self, resource: &str) -> Option<Credential>;
}

/// Provider that answers every resource with the same credential.
#[derive(Debug, Clone)]
pub struct FixedPasswordProvider {
    username: String,
    password: String,
}

impl FixedPasswordProvider {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl PasswordProvider for FixedPasswordProvider {
    fn lookup(&self, resource: &str) -> Option<Credential> {
        Some(Credential {
            username: self.username.clone(),
            password: self.password.clone(),
            backend: backend_name(resource).to_string(),
        })
    }
}

/// Credential store backed by `user:password:backend` lines.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: Vec<Credential>,
}

impl CredentialStore {
    /// Default credential file location, `~/.sane/pass`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".sane").join("pass"))
    }

    /// Load the store from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| SaneError::auth(format!("cannot read credential file {}: {e}", path.display())))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Parse records from a line-oriented reader.
    ///
    /// Malformed lines are skipped with a warning; for duplicate backends
    /// the first record wins.
    pub fn from_reader(reader: impl BufRead) -> Self {
        let mut entries: Vec<Credential> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stopping credential parse at line {}: {e}", number + 1);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.splitn(3, ':');
            let (username, password, backend) = match (fields.next(), fields.next(), fields.next()) {
                (Some(u), Some(p), Some(b)) => (u, p, b),
                _ => {
                    warn!("ignoring malformed credential line {}", number + 1);
                    continue;
                }
            };

            if entries.iter().any(|c| c.backend == backend) {
                warn!("ignoring duplicate credential for backend {backend}");
                continue;
            }

            entries.push(Credential {
                username: username.to_string(),
                password: password.to_string(),
                backend: backend.to_string(),
            });
        }

        debug!("loaded {} credential(s)", entries.len());
        Self { entries }
    }

    /// First credential whose backend matches the resource.
    pub fn get(&self, resource: &str) -> Option<&Credential> {
        let backend = backend_name(resource);
        self.entries.iter().find(|c| c.backend == backend)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PasswordProvider for CredentialStore {
    fn lookup(&self, resource: &str) -> Option<Credential> {
        self.get(resource).cloned()
    }
}

/// Backend name of a resource, with any `$MD5$<salt>` suffix removed.
pub fn backend_name(resource: &str) -> &str {
    match resource.find(MD5_MARKER) {
        Some(position) => &resource[..position],
        None => resource,
    }
}

/// Password string to transmit for a resource.
///
/// Resources bearing a `$MD5$<salt>` suffix get
/// `"$MD5$" + lowercase_hex(md5(salt || password))` over ISO-8859-1 bytes;
/// all others get the password verbatim.
pub(crate) fn encode_password(resource: &str, password: &str) -> String {
    let Some(position) = resource.find(MD5_MARKER) else {
        return password.to_string();
    };
    let salt = &resource[position + MD5_MARKER.len()..];

    let mut hasher = Md5::new();
    hasher.update(string_to_latin1(salt));
    hasher.update(string_to_latin1(password));
    let digest = hasher.finalize();

    format!("{MD5_MARKER}{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backend_name_strips_md5_suffix() {
        assert_eq!(backend_name("net:pixma"), "net:pixma");
        assert_eq!(backend_name("pixma$MD5$abcdef"), "pixma");
        assert_eq!(backend_name("$MD5$abcdef"), "");
    }

    #[test]
    fn test_plain_password_passes_through() {
        assert_eq!(encode_password("pixma", "secret"), "secret");
    }

    #[test]
    fn test_salted_password_uses_md5_of_salt_then_password() {
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72; salt "ab" + password "c"
        assert_eq!(
            encode_password("backend$MD5$ab", "c"),
            "$MD5$900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_salted_password_empty_salt_and_password() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(
            encode_password("backend$MD5$", ""),
            "$MD5$d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_store_parses_records() {
        let store = CredentialStore::from_reader("alice:secret:pixma\nbob:hunter2:net:epson\n".as_bytes());
        let cred = store.get("pixma").unwrap();
        assert_eq!(cred.username, "alice");
        assert_eq!(cred.password, "secret");

        // The backend field may itself contain colons
        let cred = store.get("net:epson").unwrap();
        assert_eq!(cred.username, "bob");
        assert_eq!(cred.password, "hunter2");
    }

    #[test]
    fn test_store_skips_short_lines() {
        let store = CredentialStore::from_reader("alice:secret\n\nbob:hunter2:pixma\n".as_bytes());
        assert!(store.get("secret").is_none());
        assert_eq!(store.get("pixma").unwrap().username, "bob");
    }

    #[test]
    fn test_store_first_duplicate_wins() {
        let store = CredentialStore::from_reader("alice:first:pixma\nbob:second:pixma\n".as_bytes());
        let cred = store.get("pixma").unwrap();
        assert_eq!(cred.username, "alice");
        assert_eq!(cred.password, "first");
    }

    #[test]
    fn test_store_lookup_strips_md5_suffix() {
        let store = CredentialStore::from_reader("alice:secret:pixma\n".as_bytes());
        assert_eq!(store.get("pixma$MD5$aa55").unwrap().username, "alice");
        assert!(store.get("other$MD5$aa55").is_none());
    }

    #[test]
    fn test_store_lookup_is_idempotent() {
        let store = CredentialStore::from_reader("alice:secret:pixma\n".as_bytes());
        assert_eq!(store.get("pixma$MD5$aa55"), store.get("pixma$MD5$aa55"));
        assert_eq!(store.get("unknown"), store.get("unknown"));
    }

    #[test]
    fn test_store_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice:secret:pixma").unwrap();
        file.flush().unwrap();

        let store = CredentialStore::from_file(file.path()).unwrap();
        assert_eq!(store.get("pixma").unwrap().password, "secret");
    }

    #[test]
    fn test_store_missing_file_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = CredentialStore::from_file(&dir.path().join("nope"));
        assert!(matches!(result, Err(SaneError::Auth(_))));
    }

    #[test]
    fn test_fixed_provider_answers_all_resources() {
        let provider = FixedPasswordProvider::new("alice", "secret");
        let cred = provider.lookup("pixma$MD5$ffee").unwrap();
        assert_eq!(cred.username, "alice");
        assert_eq!(cred.password, "secret");
        assert_eq!(cred.backend, "pixma");
    }
}
