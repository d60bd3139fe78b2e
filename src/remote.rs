use std::io::{self, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::debug;

use crate::domain::{RemoteLocation, Scheme};
use crate::error::KiraError;
use crate::interrupt::Interrupt;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CHUNK_SIZE: usize = 64 * 1024;

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Anonymous read-only access to an assembly server.
pub trait RemoteClient {
    /// Names of the entries in a remote directory.
    fn list(&self, dir: &RemoteLocation) -> Result<Vec<String>, KiraError>;
    /// Full content of a remote file. The transfer stops with
    /// [`KiraError::Cancelled`] as soon as `interrupt` is raised.
    fn fetch(&self, file: &RemoteLocation, interrupt: &Interrupt) -> Result<Vec<u8>, KiraError>;
}

impl<C: RemoteClient + ?Sized> RemoteClient for &C {
    fn list(&self, dir: &RemoteLocation) -> Result<Vec<String>, KiraError> {
        (**self).list(dir)
    }

    fn fetch(&self, file: &RemoteLocation, interrupt: &Interrupt) -> Result<Vec<u8>, KiraError> {
        (**self).fetch(file, interrupt)
    }
}

/// Picks FTP or HTTP per request from the location's scheme.
#[derive(Clone)]
pub struct AnonymousClient {
    http: Client,
    timeout: Duration,
}

impl AnonymousClient {
    pub fn new(timeout: Duration) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-fetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::Http(err.to_string()))?,
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KiraError::Http(err.to_string()))?;
        Ok(Self { http, timeout })
    }

    fn connect_ftp(&self, location: &RemoteLocation) -> Result<FtpStream, KiraError> {
        let addr = resolve(location)?;
        let mut ftp = FtpStream::connect_timeout(addr, self.timeout)
            .map_err(|err| KiraError::Ftp(format!("connect {}: {err}", location.host())))?;
        ftp.get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|err| KiraError::Ftp(err.to_string()))?;
        ftp.get_ref()
            .set_write_timeout(Some(self.timeout))
            .map_err(|err| KiraError::Ftp(err.to_string()))?;
        ftp.login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
            .map_err(|err| KiraError::Ftp(format!("login {}: {err}", location.host())))?;
        ftp.transfer_type(FileType::Binary)
            .map_err(|err| KiraError::Ftp(err.to_string()))?;
        Ok(ftp)
    }

    fn ftp_list(&self, dir: &RemoteLocation) -> Result<Vec<String>, KiraError> {
        let mut ftp = self.connect_ftp(dir)?;
        let lines = ftp
            .list(Some(dir.path()))
            .map_err(|err| KiraError::Ftp(format!("list {dir}: {err}")));
        close_ftp(&mut ftp);
        Ok(parse_listing(&lines?.join("\n")))
    }

    fn ftp_fetch(
        &self,
        file: &RemoteLocation,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, KiraError> {
        let mut ftp = self.connect_ftp(file)?;
        let mut stream = match ftp.retr_as_stream(file.path()) {
            Ok(stream) => stream,
            Err(err) => {
                close_ftp(&mut ftp);
                return Err(KiraError::Ftp(format!("retrieve {file}: {err}")));
            }
        };
        // An aborted transfer leaves the control connection mid-reply, so the
        // session is dropped without QUIT.
        let content = read_interruptible(&mut stream, interrupt)?;
        ftp.finalize_retr_stream(stream)
            .map_err(|err| KiraError::Ftp(format!("retrieve {file}: {err}")))?;
        close_ftp(&mut ftp);
        Ok(content)
    }

    fn http_send(&self, url: &str) -> Result<Response, KiraError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| KiraError::Http(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .status()
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string();
            return Err(KiraError::RemoteStatus { status, message });
        }
        Ok(response)
    }
}

impl RemoteClient for AnonymousClient {
    fn list(&self, dir: &RemoteLocation) -> Result<Vec<String>, KiraError> {
        match dir.scheme() {
            Scheme::Ftp => self.ftp_list(dir),
            Scheme::Http | Scheme::Https => {
                let body = self
                    .http_send(&format!("{dir}/"))?
                    .text()
                    .map_err(|err| KiraError::Http(err.to_string()))?;
                Ok(parse_listing(&body))
            }
        }
    }

    fn fetch(&self, file: &RemoteLocation, interrupt: &Interrupt) -> Result<Vec<u8>, KiraError> {
        match file.scheme() {
            Scheme::Ftp => self.ftp_fetch(file, interrupt),
            Scheme::Http | Scheme::Https => {
                let response = self.http_send(&file.to_string())?;
                read_interruptible(response, interrupt)
            }
        }
    }
}

/// Reads a transfer body to the end in chunks, giving up with
/// [`KiraError::Cancelled`] once `interrupt` is raised.
pub fn read_interruptible(
    mut reader: impl Read,
    interrupt: &Interrupt,
) -> Result<Vec<u8>, KiraError> {
    let mut content = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if interrupt.is_requested() {
            return Err(KiraError::Cancelled);
        }
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(KiraError::Transfer(err.to_string())),
        };
        content.extend_from_slice(&chunk[..read]);
    }
    Ok(content)
}

fn resolve(location: &RemoteLocation) -> Result<SocketAddr, KiraError> {
    (location.host(), location.port())
        .to_socket_addrs()
        .map_err(|err| KiraError::Ftp(format!("resolve {}: {err}", location.host())))?
        .next()
        .ok_or_else(|| KiraError::Ftp(format!("no address for {}", location.host())))
}

fn close_ftp(ftp: &mut FtpStream) {
    if let Err(err) = ftp.quit() {
        debug!("FTP quit failed: {err}");
    }
}

/// Extracts file names from a directory listing.
///
/// Plain listings (FTP `LIST` output or bare name lists) contribute the last
/// whitespace-delimited token of each line. HTML index pages contribute the
/// targets of their `href` attributes.
pub fn parse_listing(body: &str) -> Vec<String> {
    if body.contains("href=\"") {
        return parse_html_index(body);
    }
    body.lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

fn parse_html_index(body: &str) -> Vec<String> {
    let mut names = Vec::new();
    for chunk in body.split("href=\"").skip(1) {
        let Some((target, _)) = chunk.split_once('"') else {
            continue;
        };
        if target.is_empty()
            || target.starts_with('?')
            || target.starts_with('/')
            || target.starts_with("..")
            || target.contains("://")
        {
            continue;
        }
        let name = target.trim_end_matches('/');
        if !name.is_empty() && !names.iter().any(|existing: &String| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_takes_last_token() {
        let body = "-r--r--r--   1 ftp      anonymous     1409 Jan 14  2020 md5checksums.txt\n\
                    -r--r--r--   1 ftp      anonymous  1379902 Jan 14  2020 GCF_1_ASM1_genomic.fna.gz\n";
        assert_eq!(
            parse_listing(body),
            vec!["md5checksums.txt", "GCF_1_ASM1_genomic.fna.gz"]
        );
    }

    #[test]
    fn raised_interrupt_stops_reading() {
        let interrupt = Interrupt::new();
        let body: &[u8] = b"ACGT";
        assert_eq!(read_interruptible(body, &interrupt).unwrap(), b"ACGT");

        interrupt.request();
        let err = read_interruptible(body, &interrupt).unwrap_err();
        assert!(matches!(err, KiraError::Cancelled));
    }

    #[test]
    fn listing_reads_html_index() {
        let body = r#"<a href="/genomes/all/GCF/">Parent Directory</a>
<a href="GCF_1_ASM1_assembly_structure/">GCF_1_ASM1_assembly_structure/</a>
<a href="GCF_1_ASM1_genomic.fna.gz">GCF_1_ASM1_genomic.fna.gz</a>
<a href="?C=M;O=A">Last modified</a>
<a href="md5checksums.txt">md5checksums.txt</a>"#;
        assert_eq!(
            parse_listing(body),
            vec![
                "GCF_1_ASM1_assembly_structure",
                "GCF_1_ASM1_genomic.fna.gz",
                "md5checksums.txt"
            ]
        );
    }
}
