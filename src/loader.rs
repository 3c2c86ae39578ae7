use crate::{
    config::ViewerConfig,
    sheet::{self, SheetData},
};
use std::{io, time::Duration};
use thiserror::Error;

const USER_AGENT: &str = concat!("chaptermap/", env!("CARGO_PKG_VERSION"));

pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load data from Google Sheets. Check the log for details.";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("read response body: {0}")]
    Body(#[from] io::Error),
    #[error("decode sheet rows: {0}")]
    Decode(#[from] serde_json::Error),
}

pub fn sheet_url(config: &ViewerConfig) -> String {
    format!(
        "{}/{}/{}",
        config.endpoint.trim_end_matches('/'),
        config.sheet_id,
        encode_path_segment(&config.tab_name)
    )
}

/// Downloads and decodes the mapping tab. Blocking; callers run it off the UI
/// thread.
pub fn fetch_sheet(config: &ViewerConfig) -> Result<SheetData, LoadError> {
    let url = sheet_url(config);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout_read(Duration::from_secs(30))
        .build();
    let response = match agent.get(&url).set("User-Agent", USER_AGENT).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(LoadError::Status { url, status });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(LoadError::Transport {
                url,
                reason: transport.to_string(),
            });
        }
    };
    let body = response.into_string()?;
    let data = sheet::parse_sheet(&body)?;
    Ok(data)
}

/// Same pass-through set as `encodeURIComponent`.
fn encode_path_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'~'
            | b'!'
            | b'\''
            | b'('
            | b')'
            | b'*' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_url_from_sheet_and_tab() {
        let config = ViewerConfig {
            endpoint: "https://opensheet.elk.sh/".to_string(),
            sheet_id: "abc123".to_string(),
            tab_name: "Mappings".to_string(),
        };
        assert_eq!(sheet_url(&config), "https://opensheet.elk.sh/abc123/Mappings");
    }

    #[test]
    fn encodes_tab_names() {
        assert_eq!(encode_path_segment("Chapter Map"), "Chapter%20Map");
        assert_eq!(encode_path_segment("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(encode_path_segment("v1.0_x-y~z"), "v1.0_x-y~z");
        assert_eq!(encode_path_segment("Mappings (v2)"), "Mappings%20(v2)");
        assert_eq!(encode_path_segment("it's!*"), "it's!*");
        assert_eq!(encode_path_segment("漫画"), "%E6%BC%AB%E7%94%BB");
    }

    #[test]
    fn load_errors_carry_detail() {
        let err = LoadError::Status {
            url: "https://example.test/x".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "request to https://example.test/x returned HTTP 404"
        );
        let err: LoadError = serde_json::from_str::<Vec<u8>>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("decode sheet rows:"));
    }
}
