//! One-shot local catcher for the OAuth redirect
//!
//! Binds the host/port of the configured redirect URL, answers the browser's
//! first request and hands back the full redirect URL it was sent to.

use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use url::Url;

pub struct RedirectListener {
    listener: TcpListener,
    base: Url,
}

impl RedirectListener {
    /// Bind the local address named by `redirect_url`
    pub fn bind(redirect_url: &str) -> Result<Self> {
        let base = Url::parse(redirect_url)
            .with_context(|| format!("Invalid redirect URL: {}", redirect_url))?;
        let host = match base.host_str() {
            Some("localhost") | Some("127.0.0.1") => "127.0.0.1",
            Some(other) => bail!("Redirect URL host {} is not local", other),
            None => bail!("Redirect URL has no host"),
        };
        let port = base
            .port_or_known_default()
            .context("Redirect URL has no port")?;

        let listener = TcpListener::bind((host, port))
            .with_context(|| format!("Failed to listen on {}:{}", host, port))?;
        Ok(Self { listener, base })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the browser and return the URL it was redirected to
    pub fn accept(self) -> Result<String> {
        let (mut stream, _) = self
            .listener
            .accept()
            .context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;
        // Drain the headers so closing the socket does not reset it
        let mut header = String::new();
        while reader.read_line(&mut header).is_ok_and(|n| n > 0) && !header.trim().is_empty() {
            header.clear();
        }

        // Format: GET /gmail-notifier/redirect.html?code=AUTH_CODE&scope=... HTTP/1.1
        let target = request_line
            .split_whitespace()
            .nth(1)
            .context("Malformed request line")?;
        let url = self
            .base
            .join(target)
            .with_context(|| format!("Invalid request target: {}", target))?;

        let has_code = url.query_pairs().any(|(key, value)| key == "code" && !value.is_empty());
        let (status, body) = if has_code {
            ("200 OK", "Authorization received. You can close this window.")
        } else {
            ("400 Bad Request", "Authorization failed. Please try again.")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpStream;
    use std::thread;

    fn request(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_accepts_redirect() {
        let listener = RedirectListener::bind("http://localhost:0/gmail-notifier/redirect.html").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || listener.accept());

        let response = request(addr, "/gmail-notifier/redirect.html?code=4%2Fabc&scope=x");
        let url = handle.join().unwrap().unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(url.ends_with("/gmail-notifier/redirect.html?code=4%2Fabc&scope=x"));
        assert_eq!(notifier::extract_auth_code(&url).unwrap(), "4/abc");
    }

    #[test]
    fn test_denied_redirect_is_still_forwarded() {
        let listener = RedirectListener::bind("http://127.0.0.1:0/redirect").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || listener.accept());

        let response = request(addr, "/redirect?error=access_denied");
        let url = handle.join().unwrap().unwrap();

        assert!(response.starts_with("HTTP/1.1 400"));
        assert!(notifier::extract_auth_code(&url).is_err());
    }

    #[test]
    fn test_rejects_remote_hosts() {
        assert!(RedirectListener::bind("https://example.com/redirect").is_err());
        assert!(RedirectListener::bind("not a url").is_err());
    }
}
