//! Server-rendered admin pages
//!
//! Pages are plain HTML strings. Every value that came from a request is
//! escaped before it is written into markup.

use chrono::{DateTime, Utc};
use promo_shared::{
    PromoCodeValue, DEFAULT_BATCH_COUNT, DEFAULT_BONUS_QUESTIONS, DEFAULT_CODE_LENGTH,
    DEFAULT_MAX_REDEMPTIONS, DEFAULT_PREFIX,
};

/// What a created batch grants, echoed back on the result page
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub bonus_questions: i32,
    pub max_redemptions: i32,
    pub note: String,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        body = body
    )
}

pub fn admin_form(token: &str) -> String {
    let body = format!(
        r#"<form method="post" action="/admin/create">
<input type="hidden" name="token" value="{token}">
<label>Prefix (optional) <input name="prefix" value="{prefix}"></label><br>
<label>Count <input name="count" type="number" min="1" value="{count}"></label><br>
<label>Bonus questions <input name="bonus_questions" type="number" min="1" value="{bonus}"></label><br>
<label>Max redemptions <input name="max_redemptions" type="number" min="1" value="{max}"></label><br>
<label>Code length <input name="code_length" type="number" min="4" max="16" value="{length}"></label><br>
<label>Note <input name="note"></label><br>
<label>Expires (YYYY-MM-DD, optional) <input name="expires_date" placeholder="YYYY-MM-DD"></label><br>
<button type="submit">Create codes</button>
</form>"#,
        token = escape_html(token),
        prefix = DEFAULT_PREFIX,
        count = DEFAULT_BATCH_COUNT,
        bonus = DEFAULT_BONUS_QUESTIONS,
        max = DEFAULT_MAX_REDEMPTIONS,
        length = DEFAULT_CODE_LENGTH,
    );

    page("Create promo codes", &body)
}

pub fn codes_created(codes: &[PromoCodeValue], summary: &BatchSummary, token: &str) -> String {
    let items: String = codes
        .iter()
        .map(|code| format!("<li><code>{}</code></li>\n", escape_html(code.as_str())))
        .collect();

    let expires = summary
        .expires_at
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());

    let body = format!(
        r#"<p>Created {count} codes. Each grants {bonus} bonus questions and can be redeemed {max} times.</p>
<p>Note: {note}</p>
<p>Expires: {expires}</p>
<ul>
{items}</ul>
<form method="get" action="/admin">
<input type="hidden" name="token" value="{token}">
<button type="submit">Create more</button>
</form>"#,
        count = codes.len(),
        bonus = summary.bonus_questions,
        max = summary.max_redemptions,
        note = escape_html(&summary.note),
        expires = expires,
        items = items,
        token = escape_html(token),
    );

    page("Promo codes created", &body)
}
