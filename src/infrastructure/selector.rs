//! Selector strategies and cross-frame element resolution
//!
//! The portal mixes top-level markup with same-origin iframes, so every
//! lookup runs an injected script that searches the document and each
//! reachable iframe document one level deep. CSS alone cannot express
//! "button whose text says Submit", so a strategy optionally carries a
//! text filter applied after the CSS match.
//!
//! Resolution never raises. A missing element is a `false`/`None`, which
//! lets callers walk ordered strategy lists without error plumbing.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::infrastructure::page_driver::PageDriver;

/// One way of finding an element, tried in declaration order
#[derive(Debug, Clone, Copy)]
pub struct SelectorStrategy {
    pub selector: &'static str,
    /// Case-insensitive substring the element's text must contain
    pub text: Option<&'static str>,
    pub timeout_ms: u64,
}

impl SelectorStrategy {
    pub const fn css(selector: &'static str, timeout_ms: u64) -> Self {
        Self {
            selector,
            text: None,
            timeout_ms,
        }
    }

    pub const fn with_text(selector: &'static str, text: &'static str, timeout_ms: u64) -> Self {
        Self {
            selector,
            text: Some(text),
            timeout_ms,
        }
    }
}

/// A checkbox found during a page scan
#[derive(Debug, Clone, Deserialize)]
pub struct CheckboxInfo {
    pub index: usize,
    pub label: String,
    pub checked: bool,
    pub disabled: bool,
}

/// JS prelude shared by every lookup: visibility test, frame walk, and
/// first-match search honouring an optional text filter.
fn finder_js(selector: &str, text: Option<&str>, action: &str, miss: &str) -> String {
    let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    let text = match text {
        Some(t) => serde_json::to_string(&t.to_lowercase()).unwrap_or_else(|_| "null".to_string()),
        None => "null".to_string(),
    };
    format!(
        r#"(() => {{
    const sel = {sel};
    const want = {text};
    const visible = (el) => {{
        const r = el.getBoundingClientRect();
        if (r.width === 0 || r.height === 0) return false;
        const s = window.getComputedStyle(el);
        return s.visibility !== 'hidden' && s.display !== 'none';
    }};
    const docs = [document];
    for (const f of document.querySelectorAll('iframe')) {{
        try {{ if (f.contentDocument) docs.push(f.contentDocument); }} catch (e) {{}}
    }}
    for (const d of docs) {{
        let els;
        try {{ els = d.querySelectorAll(sel); }} catch (e) {{ continue; }}
        for (const el of els) {{
            if (want !== null) {{
                const t = ((el.innerText || '') + ' ' + (el.value || '')).toLowerCase();
                if (!t.includes(want)) continue;
            }}
            if (!visible(el)) continue;
            {action}
        }}
    }}
    return {miss};
}})()"#
    )
}

impl PageDriver {
    /// Is a visible element matching the strategy present right now.
    pub async fn probe_visible(&self, strategy: &SelectorStrategy) -> bool {
        let js = finder_js(strategy.selector, strategy.text, "return true;", "false");
        self.eval_as::<bool>(&js).await.unwrap_or(false)
    }

    /// Poll for the element until the strategy's timeout elapses.
    pub async fn wait_visible(&self, strategy: &SelectorStrategy) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(strategy.timeout_ms);
        loop {
            if self.probe_visible(strategy).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("Element not found within {}ms: {}", strategy.timeout_ms, strategy.selector);
                return false;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    /// Walk an ordered strategy list, returning the first one whose
    /// element appears within its own timeout.
    pub async fn first_match<'a>(
        &self,
        strategies: &'a [SelectorStrategy],
    ) -> Option<&'a SelectorStrategy> {
        for strategy in strategies {
            if self.wait_visible(strategy).await {
                return Some(strategy);
            }
        }
        None
    }

    /// Scroll the element into view and click it.
    pub async fn click_element(&self, strategy: &SelectorStrategy) -> bool {
        let action = "el.scrollIntoView({block: 'center'}); el.click(); return true;";
        let js = finder_js(strategy.selector, strategy.text, action, "false");
        self.eval_as::<bool>(&js).await.unwrap_or(false)
    }

    /// Set an input's value and fire the events frameworks listen for.
    pub async fn fill_element(&self, strategy: &SelectorStrategy, value: &str) -> bool {
        let escaped = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
        let action = format!(
            "el.focus(); el.value = {escaped}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return true;"
        );
        let js = finder_js(strategy.selector, strategy.text, &action, "false");
        self.eval_as::<bool>(&js).await.unwrap_or(false)
    }

    /// Send an Enter keypress to the element, for forms submitted by key.
    pub async fn press_enter(&self, strategy: &SelectorStrategy) -> bool {
        let action = "el.focus(); \
             for (const type of ['keydown', 'keypress', 'keyup']) {\
                 el.dispatchEvent(new KeyboardEvent(type, {key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true}));\
             }\
             if (el.form) el.form.requestSubmit ? el.form.requestSubmit() : el.form.submit(); \
             return true;";
        let js = finder_js(strategy.selector, strategy.text, action, "false");
        self.eval_as::<bool>(&js).await.unwrap_or(false)
    }

    /// List every visible checkbox with its best-effort label text.
    pub async fn checkbox_scan(&self) -> Vec<CheckboxInfo> {
        let js = r#"(() => {
    const docs = [document];
    for (const f of document.querySelectorAll('iframe')) {
        try { if (f.contentDocument) docs.push(f.contentDocument); } catch (e) {}
    }
    const out = [];
    let index = 0;
    for (const d of docs) {
        for (const el of d.querySelectorAll('input[type="checkbox"]')) {
            const r = el.getBoundingClientRect();
            if (r.width === 0 && r.height === 0) { index++; continue; }
            let label = el.getAttribute('aria-label') || '';
            if (!label && el.id) {
                const l = d.querySelector('label[for="' + el.id + '"]');
                if (l) label = l.innerText;
            }
            if (!label) {
                const l = el.closest('label');
                if (l) label = l.innerText;
            }
            if (!label && el.parentElement) label = el.parentElement.innerText;
            // Keyword matching also sees the control's own attributes
            label = [label, el.name || '', el.id || '', el.className || ''].join(' ');
            out.push({index: index, label: (label || '').trim(), checked: el.checked, disabled: !!el.disabled});
            index++;
        }
    }
    return out;
})()"#;
        self.eval_as::<Vec<CheckboxInfo>>(js).await.unwrap_or_default()
    }

    /// Check the checkbox at a scan index if it is not already checked.
    pub async fn click_checkbox(&self, index: usize) -> bool {
        let js = format!(
            r#"(() => {{
    const docs = [document];
    for (const f of document.querySelectorAll('iframe')) {{
        try {{ if (f.contentDocument) docs.push(f.contentDocument); }} catch (e) {{}}
    }}
    let i = 0;
    for (const d of docs) {{
        for (const el of d.querySelectorAll('input[type="checkbox"]')) {{
            if (i === {index}) {{
                if (!el.checked) {{
                    el.scrollIntoView({{block: 'center'}});
                    el.click();
                }}
                return el.checked || true;
            }}
            i++;
        }}
    }}
    return false;
}})()"#
        );
        self.eval_as::<bool>(&js).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finder_js_escapes_selector() {
        let js = finder_js("button[name=\"go\"]", None, "return true;", "false");
        assert!(js.contains(r#"const sel = "button[name=\"go\"]";"#));
        assert!(js.contains("const want = null;"));
    }

    #[test]
    fn test_finder_js_lowercases_text_filter() {
        let js = finder_js("button", Some("Submit"), "return true;", "false");
        assert!(js.contains(r#"const want = "submit";"#));
    }

    #[test]
    fn test_strategy_constructors() {
        let s = SelectorStrategy::with_text("button", "submit", 5000);
        assert_eq!(s.selector, "button");
        assert_eq!(s.text, Some("submit"));
        assert_eq!(s.timeout_ms, 5000);
        assert!(SelectorStrategy::css("#ssnInput", 1000).text.is_none());
    }
}
