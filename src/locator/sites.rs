//! Composer selectors for sites whose focus lands on a wrapper element.

const GEMINI: &[&str] = &[
    r#"textarea[aria-label*="Enter a prompt"]"#,
    r#"textarea[placeholder*="Enter a prompt"]"#,
    ".ql-editor[contenteditable]",
    r#"div[contenteditable="true"]"#,
];

const CHATGPT: &[&str] = &[
    "#prompt-textarea",
    r#"textarea[data-id="root"]"#,
    r#"div[contenteditable="true"]"#,
];

const CLAUDE: &[&str] = &[r#"div[contenteditable="true"]"#, r#"[role="textbox"]"#];

const NOTION: &[&str] = &[r#"[contenteditable="true"]"#, r#"[role="textbox"]"#];

static SITE_SELECTORS: &[(&str, &[&str])] = &[
    ("gemini.google.com", GEMINI),
    ("chat.openai.com", CHATGPT),
    ("chatgpt.com", CHATGPT),
    ("claude.ai", CLAUDE),
    ("notion.so", NOTION),
    ("www.notion.so", NOTION),
];

/// Selectors to try, in order, for `hostname`.
pub fn selectors_for(hostname: &str) -> &'static [&'static str] {
    SITE_SELECTORS
        .iter()
        .find(|(host, _)| *host == hostname)
        .map(|(_, selectors)| *selectors)
        .unwrap_or(&[])
}
