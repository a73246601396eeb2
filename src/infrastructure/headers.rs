//! Request header utilities at the transport boundary

use http::{HeaderMap, header};

/// Language tag used when a request declares no usable preference
pub const DEFAULT_LANGUAGE: &str = "en";

/// Render a one-line device summary from request headers for audit logs.
pub fn get_device_info(headers: &HeaderMap) -> String {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("Unknown");
    let accept_language = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("Unknown");

    format!("User-Agent: {user_agent}; Accept-Language: {accept_language}")
}

/// Primary language subtags from the `Accept-Language` header.
///
/// Entries keep their header order; `;q=` weights are stripped, never
/// sorted by. Each tag is reduced to the text before its first `-`.
/// A missing, empty, bare-wildcard, or garbage header yields the default
/// language as a single-element list. A wildcard inside a multi-entry
/// list is preserved literally.
pub fn parse_accept_language(headers: &HeaderMap) -> Vec<String> {
    let raw = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    let raw = match raw {
        Some(value) if !value.is_empty() => value,
        _ => return vec![DEFAULT_LANGUAGE.to_string()],
    };

    if raw == "*" || raw == "null" || raw == "undefined" {
        return vec![DEFAULT_LANGUAGE.to_string()];
    }

    let languages: Vec<String> = raw
        .split(',')
        .filter_map(|entry| {
            let tag = entry.split(';').next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("");
            if primary.is_empty() {
                None
            } else {
                Some(primary.to_string())
            }
        })
        .collect();

    if languages.is_empty() {
        return vec![DEFAULT_LANGUAGE.to_string()];
    }

    languages
}
