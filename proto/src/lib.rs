pub mod consts;

use serde::Deserialize;

/// Server metadata returned by the status endpoint.
///
/// The server reports its runtime under the `python` key; it is exposed
/// here under the interpreter-neutral name `runtime`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    pub time: String,
    pub uptime: String,
    #[serde(rename = "python")]
    pub runtime: String,
    pub platform: String,
}

/// Body of the file listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileList {
    pub files: Vec<String>,
}

/// Acknowledgement body sent by mutating endpoints (upload, delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Ack {
    pub status: bool,
}
