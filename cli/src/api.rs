use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{bail, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use url::Url;

use nanoctl_proto::consts::*;
use nanoctl_proto::{Ack, FileList, ServerStatus};

use crate::config::Credentials;

pub trait Api {
    fn list(&self) -> Result<Vec<String>>;
    fn status(&self) -> Result<ServerStatus>;
    fn push(&self, filename: &str, file: File) -> Result<()>;
    fn pull(&self, filename: &str, file: &File) -> Result<()>;
    fn remove(&self, filename: &str) -> Result<()>;
    fn ping(&self) -> Result<()>;
}

impl<T: Api> Api for &T {
    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }

    fn status(&self) -> Result<ServerStatus> {
        (**self).status()
    }

    fn push(&self, filename: &str, file: File) -> Result<()> {
        (**self).push(filename, file)
    }

    fn pull(&self, filename: &str, file: &File) -> Result<()> {
        (**self).pull(filename, file)
    }

    fn remove(&self, filename: &str) -> Result<()> {
        (**self).remove(filename)
    }

    fn ping(&self) -> Result<()> {
        (**self).ping()
    }
}

pub struct HttpClient {
    client: Client,
    server_url: Url,
    credentials: Option<Credentials>,
}

impl HttpClient {
    pub fn new(server_url: Url, credentials: Option<Credentials>) -> Self {
        let client = Client::new();

        Self {
            client,
            server_url,
            credentials,
        }
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        Ok(self.server_url.join(method)?)
    }

    fn file_endpoint(&self, method: &str, filename: &str) -> Result<Url> {
        check_filename(filename)?;
        Ok(self.server_url.join(&format!("{method}{filename}"))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }
}

/// Filenames end up as a single path segment of the request URL, so
/// anything that could change the path is rejected up front. `?`, `#`
/// and `%` would be parsed as query, fragment or percent-escape by the
/// URL parser and silently target a different file.
pub fn check_filename(filename: &str) -> Result<()> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '?', '#', '%'])
    {
        bail!("Invalid filename: {filename:?}");
    }
    Ok(())
}

/// Upload replies the server considers successful. 204 is its reply to
/// a zero-length upload; it stores nothing but the request itself went
/// through.
fn upload_accepted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::CREATED | StatusCode::OK | StatusCode::NO_CONTENT
    )
}

fn check_ok(response: Response) -> Result<Response> {
    if response.status() != StatusCode::OK {
        bail!(
            "Server returned error status code: {}\n{}",
            response.status(),
            response.text()?
        );
    }
    Ok(response)
}

impl Api for HttpClient {
    fn list(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.client.get(self.endpoint(METHOD_LS)?))
            .send()?;

        let list: FileList = check_ok(response)?.json()?;
        Ok(list.files)
    }

    fn status(&self) -> Result<ServerStatus> {
        let response = self
            .authorize(self.client.get(self.endpoint(METHOD_STATUS)?))
            .send()?;

        Ok(check_ok(response)?.json()?)
    }

    fn push(&self, filename: &str, file: File) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.file_endpoint(METHOD_UPLOAD, filename)?))
            .body(file)
            .send()?;

        if !upload_accepted(response.status()) {
            bail!(
                "Server returned error status code: {}\n{}",
                response.status(),
                response.text()?
            );
        }

        Ok(())
    }

    fn pull(&self, filename: &str, file: &File) -> Result<()> {
        let response = self
            .authorize(
                self.client
                    .get(self.file_endpoint(METHOD_DOWNLOAD, filename)?),
            )
            .send()?;

        let mut response = check_ok(response)?;

        let mut writer = BufWriter::new(file);
        response.copy_to(&mut writer)?;
        writer.flush()?;

        Ok(())
    }

    fn remove(&self, filename: &str) -> Result<()> {
        let response = self
            .authorize(
                self.client
                    .delete(self.file_endpoint(METHOD_DELETE, filename)?),
            )
            .send()?;

        let ack: Ack = check_ok(response)?.json()?;
        if !ack.status {
            bail!("Server refused to delete {filename}");
        }

        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.endpoint(METHOD_PING)?))
            .send()?;

        let reply = check_ok(response)?.text()?;
        if reply != PING_REPLY {
            bail!("Unexpected ping reply: {reply:?}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_filenames_are_accepted() {
        for name in ["main.py", "data.bin", "with space.txt", "..hidden", "a"] {
            assert!(check_filename(name).is_ok(), "{name:?} should be accepted");
        }
    }

    #[test]
    fn path_like_filenames_are_rejected() {
        for name in ["", ".", "..", "a/b", "/etc/passwd", "..\\boot.py"] {
            assert!(check_filename(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn url_metacharacters_in_filenames_are_rejected() {
        // "a?b.py" would otherwise become path "a" plus query "b.py".
        for name in ["a?b.py", "a#b.py", "a%2e%2e.py", "?", "#frag"] {
            assert!(check_filename(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn upload_replies_accepted_and_rejected() {
        for status in [
            StatusCode::CREATED,
            StatusCode::OK,
            StatusCode::NO_CONTENT,
        ] {
            assert!(upload_accepted(status), "{status} should be accepted");
        }
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_IMPLEMENTED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!upload_accepted(status), "{status} should be rejected");
        }
    }

    #[test]
    fn file_endpoints_join_under_the_base_url() {
        let client = HttpClient::new(Url::parse("http://192.168.4.1/").unwrap(), None);

        assert_eq!(
            client.file_endpoint(METHOD_UPLOAD, "main.py").unwrap().as_str(),
            "http://192.168.4.1/api/upload/main.py"
        );
        assert_eq!(
            client
                .file_endpoint(METHOD_DOWNLOAD, "data.bin")
                .unwrap()
                .as_str(),
            "http://192.168.4.1/api/download/data.bin"
        );
        assert!(client.file_endpoint(METHOD_DOWNLOAD, "../secrets.py").is_err());
    }

    #[test]
    fn plain_endpoints_join_under_the_base_url() {
        let client = HttpClient::new(Url::parse("http://192.168.4.1/").unwrap(), None);

        assert_eq!(
            client.endpoint(METHOD_LS).unwrap().as_str(),
            "http://192.168.4.1/api/ls"
        );
        assert_eq!(
            client.endpoint(METHOD_STATUS).unwrap().as_str(),
            "http://192.168.4.1/api/status"
        );
        assert_eq!(
            client.endpoint(METHOD_PING).unwrap().as_str(),
            "http://192.168.4.1/ping"
        );
    }
}
