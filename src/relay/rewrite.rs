/// Path the injected widget script is served from.
pub const INJECTED_SCRIPT_PATH: &str = "/familystream-ha-integration.js";

pub fn script_tag() -> String {
    format!(r#"<script src="{INJECTED_SCRIPT_PATH}"></script>"#)
}

/// Rewrite a forwarded HTML page: target-origin URLs become relay-relative and the
/// widget script is injected before `</body>`.
pub fn rewrite_html(html: &str, target_host: &str) -> String {
    inject_script(&relativize_urls(html, target_host), &script_tag())
}

/// Insert `tag` before the last `</body>` (any case), or append it when the page has
/// none. Pages that already reference the script are returned unchanged.
pub fn inject_script(html: &str, tag: &str) -> String {
    if html.contains(INJECTED_SCRIPT_PATH) {
        return html.to_string();
    }
    // ASCII lowercasing keeps byte offsets identical
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(tag);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

/// Turn absolute references to the target origin into relay-relative paths so that
/// navigation and subresources keep flowing through the relay.
pub fn relativize_urls(input: &str, target_host: &str) -> String {
    let out = replace_origin(input, &format!("https://{target_host}"));
    let out = replace_origin(&out, &format!("http://{target_host}"));
    replace_origin(&out, &format!("//{target_host}"))
}

/// Replace `origin` where it is a whole origin, i.e. followed by a path, query,
/// fragment, quote or the end of the text. `origin.example.cdn.net` is left alone.
fn replace_origin(input: &str, origin: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(origin) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + origin.len()..];
        match after.chars().next() {
            Some('/') => {}
            None | Some('"' | '\'' | '?' | '#' | ')' | '<' | '>') => out.push('/'),
            Some(c) if c.is_whitespace() => out.push('/'),
            Some(_) => out.push_str(origin),
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Drop the `Domain=` attribute so the cookie binds to the relay's own host.
pub fn strip_cookie_domain(cookie: &str) -> String {
    cookie
        .split(';')
        .filter(|attr| {
            !attr
                .trim_start()
                .get(..7)
                .is_some_and(|name| name.eq_ignore_ascii_case("domain="))
        })
        .collect::<Vec<_>>()
        .join(";")
}
