//! Finder scripts injected into the page.
//!
//! Each builder wraps a locator-specific element finder in an IIFE that
//! performs one operation and returns a JSON-serializable result. String
//! arguments are embedded as JSON literals so arbitrary selector and
//! label text cannot break out of the script.

use page_probe::Locator;

pub const BODY_TEXT: &str = "document.body ? document.body.innerText : ''";

/// Elements worth matching by visible text: interactive controls and the
/// headings the step markers live in.
const TEXT_SCOPE: &str =
    "button, a, [role=\"button\"], input[type=\"submit\"], h1, h2, h3, legend, label, span";

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

/// An expression that evaluates to the matched element or `null`.
fn finder(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => format!("document.querySelector({})", quote(selector)),
        Locator::Labelled(label) => format!(
            "(() => {{\
               const needle = {};\
               const label = Array.from(document.querySelectorAll('label'))\
                 .find(l => l.textContent.trim().includes(needle));\
               if (label) {{\
                 if (label.htmlFor) return document.getElementById(label.htmlFor);\
                 const inner = label.querySelector('input, select, textarea');\
                 if (inner) return inner;\
               }}\
               return document.querySelector(`[placeholder=\"${{needle}}\"]`);\
             }})()",
            quote(label)
        ),
        Locator::Text { content, exact } => format!(
            "(() => {{\
               const needle = {};\
               return Array.from(document.querySelectorAll({}))\
                 .find(el => {} ? el.textContent.trim() === needle\
                             : el.textContent.trim().includes(needle)) || null;\
             }})()",
            quote(content),
            quote(TEXT_SCOPE),
            exact
        ),
    }
}

pub fn exists(locator: &Locator) -> String {
    format!("!!({})", finder(locator))
}

pub fn is_visible(locator: &Locator) -> String {
    format!(
        "(() => {{\
           const el = {};\
           if (!el) return false;\
           const rect = el.getBoundingClientRect();\
           return rect.width > 0 && rect.height > 0;\
         }})()",
        finder(locator)
    )
}

/// `null` when the element is missing or has no disabled semantics.
pub fn is_enabled(locator: &Locator) -> String {
    format!(
        "(() => {{\
           const el = {};\
           if (!el) return null;\
           if (typeof el.disabled !== 'boolean') return null;\
           return !el.disabled && el.getAttribute('aria-disabled') !== 'true';\
         }})()",
        finder(locator)
    )
}

pub fn text_of(locator: &Locator) -> String {
    format!(
        "(() => {{ const el = {}; return el ? el.textContent : null; }})()",
        finder(locator)
    )
}

pub fn fill(locator: &Locator, value: &str) -> String {
    format!(
        "(() => {{\
           const el = {};\
           if (!el) return false;\
           const proto = el.tagName === 'TEXTAREA'\
             ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;\
           const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;\
           el.focus();\
           setter.call(el, {});\
           el.dispatchEvent(new Event('input', {{ bubbles: true }}));\
           el.dispatchEvent(new Event('change', {{ bubbles: true }}));\
           return true;\
         }})()",
        finder(locator),
        quote(value)
    )
}

pub fn read_value(locator: &Locator) -> String {
    format!(
        "(() => {{\
           const el = {};\
           if (!el) return null;\
           return typeof el.value === 'string' ? el.value : null;\
         }})()",
        finder(locator)
    )
}

pub fn click(locator: &Locator) -> String {
    format!(
        "(() => {{\
           const el = {};\
           if (!el) return false;\
           el.scrollIntoView({{ block: 'center' }});\
           el.click();\
           return true;\
         }})()",
        finder(locator)
    )
}
