// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for hostile input.

/// A minimal valid document with `marker` in its body.
pub fn document(marker: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\"><head><title>{marker}</title></head>\n<body>\n<p>{marker}</p>\n</body></html>\n"
    )
}

/// A valid document padded with whitespace to exactly `len` bytes.
pub fn document_of_len(len: usize) -> String {
    let shell = "<html><body></body></html>";
    assert!(len >= shell.len());
    format!("{shell}{}", " ".repeat(len - shell.len()))
}

/// Names that must never reach the filesystem.
pub fn hostile_names() -> Vec<&'static str> {
    vec![
        "..",
        ".",
        "../etc/passwd",
        "..\\windows",
        "a/b",
        "a.html",
        ".hidden",
        "name with space",
        "semi;colon",
        "quote\"",
        "null\0byte",
        "%2e%2e",
        "ünicode",
        "tab\tname",
        " padded ",
        "trailing\n",
    ]
}

/// Percent-encoded path segments that decode to hostile names.
pub fn hostile_path_segments() -> Vec<&'static str> {
    vec![
        "..%2Fetc%2Fpasswd",
        "%2E%2E",
        "a%2Fb",
        "a.html",
        "..%5Cwindows",
        "name%20with%20space",
        "%00",
    ]
}

/// Documents that fail structural checks.
pub fn malformed_documents() -> Vec<&'static str> {
    vec![
        "",
        "just text",
        "<body>no html</body>",
        "<html>no body</html>",
        "<html><body>unclosed",
        "<htmlx><bodyx></bodyx></htmlx>",
        "<html><body class=\"never closed</body></html>",
    ]
}
