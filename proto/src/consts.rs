pub const METHOD_LS: &str = "api/ls";
pub const METHOD_STATUS: &str = "api/status";
pub const METHOD_UPLOAD: &str = "api/upload/";
pub const METHOD_DOWNLOAD: &str = "api/download/";
pub const METHOD_DELETE: &str = "api/delete/";
pub const METHOD_PING: &str = "ping";

pub const PING_REPLY: &str = "pong";
