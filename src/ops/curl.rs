use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tokio::process::Command;

/// HTTP client using curl for making API requests.
pub struct CurlClient {
    basic_auth: Option<(String, String)>,
}

/// Status and body of an HTTP response. Callers decide which non-2xx
/// statuses are fatal.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl CurlClient {
    pub fn new() -> Self {
        Self { basic_auth: None }
    }

    pub fn with_basic_auth(username: String, password: String) -> Self {
        Self {
            basic_auth: Some((username, password)),
        }
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut args = self.common_args();
        args.push("-H".to_string());
        args.push("Accept: application/json".to_string());
        args.push(url.to_string());

        let output = Command::new("curl")
            .args(&args)
            .output()
            .await
            .context("Failed to execute curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }

    /// Make a POST request with a JSON body
    pub async fn post_json(&self, url: &str, json_data: &str) -> Result<HttpResponse> {
        let mut args = self.common_args();
        args.extend(
            [
                "-X",
                "POST",
                "-H",
                "Accept: application/json",
                "-H",
                "Content-Type: application/json",
                "-d",
                json_data,
                url,
            ]
            .map(str::to_string),
        );

        let output = Command::new("curl")
            .args(&args)
            .output()
            .await
            .context("Failed to execute curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![
            "-s".to_string(),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
            "--connect-timeout".to_string(),
            "30".to_string(),
        ];
        if let Some((username, password)) = &self.basic_auth {
            args.push("-u".to_string());
            args.push(format!("{}:{}", username, password));
        }
        args
    }
}

/// Parse curl response with status code appended
fn parse_response(stdout: Vec<u8>) -> Result<HttpResponse> {
    let output_str = String::from_utf8(stdout)?;
    let mut lines: Vec<&str> = output_str.rsplitn(2, '\n').collect();
    lines.reverse();

    let body = lines.first().unwrap_or(&"").to_string();
    let status = lines
        .get(1)
        .and_then(|s| s.parse::<u16>().ok())
        .context("curl response is missing a status code")?;

    Ok(HttpResponse { status, body })
}
