/*! Terminal HTTP target of an onion request.
*/

use serde::{Deserialize, Serialize};

/// Scheme the terminal hop uses for the outbound request.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTPS.
    Https,
}

impl Protocol {
    /// Wire name of the scheme.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

/** Where the terminal hop delivers the request.

The serialized form doubles as the routing JSON tail of the terminal
layer:

```text
{"host":"...","port":443,"protocol":"https","target":"/..."}
```
*/
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Destination {
    /// Host name or IP address of the target server.
    pub host: String,
    /// TCP port of the target server.
    pub port: u16,
    /// Scheme of the outbound request.
    pub protocol: Protocol,
    /// Request path, starting with `/`.
    pub target: String,
}

impl Destination {
    /// Create a new `Destination`.
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol, target: impl Into<String>) -> Destination {
        Destination {
            host: host.into(),
            port,
            protocol,
            target: target.into(),
        }
    }

    /// All fields are mandatory: non-empty host, non-zero port and an
    /// absolute target path.
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && self.port != 0 && self.target.starts_with('/')
    }
}
