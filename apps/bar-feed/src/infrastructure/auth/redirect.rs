//! Loopback Redirect Listener
//!
//! Captures the one-time OAuth authorization code. The brokerage
//! redirects the user's browser back to the configured loopback URI
//! with a `code` query parameter; this adapter accepts that single
//! request, answers a self-closing page, and hands the code to the
//! bootstrap.

use async_trait::async_trait;
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::application::ports::{CodeReceiver, CodeReceiverError};

/// Page served to the browser once the code is captured.
const REDIRECT_RESPONSE_BODY: &str =
    "<html><body><script>window.open('','_self').close();</script></body></html>";

/// One-shot HTTP listener on the OAuth redirect URI.
#[derive(Debug, Clone)]
pub struct LoopbackCodeListener {
    redirect_uri: String,
}

impl LoopbackCodeListener {
    /// Create a listener for the given redirect URI
    /// (e.g. `http://localhost:1234/`).
    #[must_use]
    pub const fn new(redirect_uri: String) -> Self {
        Self { redirect_uri }
    }

    /// Resolve the host/port to bind from the redirect URI.
    fn bind_addr(&self) -> Result<(String, u16), CodeReceiverError> {
        let url = Url::parse(&self.redirect_uri)
            .map_err(|e| CodeReceiverError::InvalidRedirectUri(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| {
                CodeReceiverError::InvalidRedirectUri("redirect URI has no host".to_string())
            })?
            .to_string();
        let port = url.port_or_known_default().ok_or_else(|| {
            CodeReceiverError::InvalidRedirectUri("redirect URI has no port".to_string())
        })?;
        Ok((host, port))
    }
}

#[async_trait]
impl CodeReceiver for LoopbackCodeListener {
    async fn wait_for_code(&self) -> Result<String, CodeReceiverError> {
        let (host, port) = self.bind_addr()?;
        let listener = TcpListener::bind((host.as_str(), port)).await?;
        tracing::info!(%host, port, "Waiting for OAuth redirect");

        // Browsers may issue extra requests (favicon and the like);
        // keep accepting until one carries a code.
        loop {
            let (stream, peer) = listener.accept().await?;
            match handle_connection(stream).await {
                Ok(Some(code)) => {
                    tracing::info!(%peer, "Authorization code received");
                    return Ok(code);
                }
                Ok(None) => {
                    tracing::debug!(%peer, "Redirect request without code, ignoring");
                }
                Err(e) => {
                    tracing::debug!(%peer, error = %e, "Redirect connection error, ignoring");
                }
            }
        }
    }
}

/// Read one HTTP request, answer it, and extract the `code` parameter.
async fn handle_connection(mut stream: TcpStream) -> std::io::Result<Option<String>> {
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let code = extract_code(&request);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        REDIRECT_RESPONSE_BODY.len(),
        REDIRECT_RESPONSE_BODY
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;

    Ok(code)
}

/// Pull the `code` query parameter out of the request line.
fn extract_code(request: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" {
        return None;
    }

    let url = Url::parse(&format!("http://localhost{target}")).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
