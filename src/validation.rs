use reqwest::Url;

const MAX_TOKEN_LEN: usize = 4096;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_FILE_NAME_LEN: usize = 255;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_PAGE_LIMIT: u32 = 100;

fn has_control_chars(input: &str) -> bool {
    input.chars().any(char::is_control)
}

pub fn validate_token(token: &str) -> Result<(), String> {
    if token.is_empty() {
        return Err("Token is required".to_string());
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(format!("Token is too long (max {MAX_TOKEN_LEN} chars)"));
    }
    if has_control_chars(token) {
        return Err("Token contains control characters".to_string());
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '+' | '='))
    {
        return Err("Token contains unsupported characters".to_string());
    }
    Ok(())
}

/// The API base URL must be http(s) with a host; production builds require https.
pub fn validate_api_url(url: &str, production: bool) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid API URL: {e}"))?;
    match parsed.scheme() {
        "https" => {}
        "http" if !production => {}
        "http" => return Err("API URL must use https in production".to_string()),
        other => return Err(format!("Unsupported API URL scheme: {other}")),
    }
    if parsed.host_str().is_none() {
        return Err("API URL must include host".to_string());
    }
    Ok(parsed)
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("Email is too long (max {MAX_EMAIL_LEN} chars)"));
    }
    if has_control_chars(email) || email.contains(char::is_whitespace) {
        return Err("Email contains invalid characters".to_string());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Email must contain @".to_string());
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Email is not valid".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password is too long (max {MAX_PASSWORD_LEN} chars)"
        ));
    }
    Ok(())
}

pub fn validate_upload(file_name: &str, mime: &str, size: usize) -> Result<(), String> {
    if file_name.trim().is_empty() {
        return Err("File name is required".to_string());
    }
    if file_name.len() > MAX_FILE_NAME_LEN || has_control_chars(file_name) {
        return Err("File name is not valid".to_string());
    }
    if !mime.starts_with("image/") {
        return Err(format!("Only images can be uploaded (got {mime})"));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(format!(
            "Image is too large (max {} MB)",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

pub fn clamp_limit(limit: Option<u32>, fallback: u32) -> u32 {
    limit.unwrap_or(fallback).clamp(1, MAX_PAGE_LIMIT)
}
