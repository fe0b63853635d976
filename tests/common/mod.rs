#![allow(dead_code)]

pub mod spec_tree {
    use specroute::config::RouterConfig;
    use std::fs::File;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    pub const SERVER: &str = "http://localhost:8080";

    /// Index document of the `test-api` fixture.
    pub const INDEX_RAML: &str = r#"#%RAML 1.0
title: Test API
version: v1
baseUri: http://old/x
mediaType: application/json
/search:
  get:
/users:
  get:
  post:
  /{id}:
    get:
    delete:
"#;

    /// Number of routes declared by [`INDEX_RAML`].
    pub const INDEX_ROUTES: usize = 5;

    static TOUCH_OFFSET: AtomicU64 = AtomicU64::new(1);

    /// A specification root in a temporary directory.
    pub struct SpecTree {
        dir: TempDir,
    }

    impl SpecTree {
        pub fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        /// A tree holding `test-api/v1` with [`INDEX_RAML`].
        pub fn with_test_api() -> Self {
            let tree = Self::new();
            tree.write("test-api", "v1", "index.raml", INDEX_RAML);
            tree
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn spec_dir(&self, api: &str, version: &str) -> PathBuf {
            self.root().join(api).join(version)
        }

        /// Write `file` (may contain `/`) under `{root}/{api}/{version}/`.
        pub fn write(&self, api: &str, version: &str, file: &str, content: impl AsRef<[u8]>) -> PathBuf {
            let path = self.spec_dir(api, version).join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
            path
        }

        pub fn config(&self) -> RouterConfig {
            self.config_with(&[])
        }

        pub fn config_with(&self, extra: &[(&str, &str)]) -> RouterConfig {
            let root = self.root().to_string_lossy().into_owned();
            let mut pairs: Vec<(String, String)> = vec![
                ("server".into(), SERVER.into()),
                ("api_uri".into(), "api".into()),
                ("spec_uri".into(), "spec".into()),
                ("spec_root".into(), root),
                ("handler_namespace".into(), "Handlers".into()),
            ];
            pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
            RouterConfig::from_pairs(pairs)
        }
    }

    /// Move the modification time of `path` forward so stamp checks see a change.
    pub fn touch(path: &Path) {
        let offset = TOUCH_OFFSET.fetch_add(1, Ordering::SeqCst);
        let later = SystemTime::now() + Duration::from_secs(60 * offset);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(later)
            .unwrap();
    }
}

pub mod counting {
    use specroute::spec::{Definition, DefinitionParser, ParseError, ResourceTreeParser};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Resource-tree parser that counts invocations and can be slowed down.
    #[derive(Default)]
    pub struct CountingParser {
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl CountingParser {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Some(delay),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DefinitionParser for CountingParser {
        fn parse(&self, source: &str, base_dir: &Path) -> Result<Definition, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            ResourceTreeParser.parse(source, base_dir)
        }
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Parsed raw HTTP response.
    pub struct RawResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl RawResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    /// Send one request with `Connection: close` and read the whole response.
    pub fn send_request(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)]) -> RawResponse {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
        for (k, v) in headers {
            req.push_str(&format!("{k}: {v}\r\n"));
        }
        req.push_str("\r\n");
        stream.write_all(req.as_bytes()).unwrap();

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        parse(&buf)
    }

    fn parse(buf: &[u8]) -> RawResponse {
        let split = buf
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8_lossy(&buf[..split]).into_owned();
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        RawResponse {
            status,
            headers,
            body: buf[split + 4..].to_vec(),
        }
    }
}
