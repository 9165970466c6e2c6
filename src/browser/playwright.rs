//! Playwright integration for headless browser automation.
//!
//! This module contains the long-lived helper script, reply error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{PclError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Helper run as `node -e DRIVER_SCRIPT <headless>`.
///
/// Reads one JSON request per stdin line and answers with one JSON reply per
/// stdout line, matched by `id`. Requests are handled concurrently; the
/// browser is launched on the first `openContext`.
pub(crate) const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const headless = process.argv[1] !== '0';
const contexts = new Map();
let nextContextId = 0;
let browserPromise = null;

function send(message) {
  process.stdout.write(JSON.stringify(message) + '\n');
}

function errorKind(err) {
  const message = err && err.message ? err.message : String(err);
  if (message.includes("Cannot find module 'playwright'")) return 'missing-playwright';
  if (message.includes("Executable doesn't exist")) return 'missing-browser';
  if ((err && err.name === 'TimeoutError') || /timeout/i.test(message)) return 'timeout';
  return 'error';
}

function launch() {
  if (!browserPromise) {
    const { chromium } = require('playwright');
    browserPromise = chromium.launch({ headless });
  }
  return browserPromise;
}

function entry(req) {
  const found = contexts.get(req.contextId);
  if (!found) throw new Error(`unknown context ${req.contextId}`);
  return found;
}

const sleep = (ms) => new Promise((resolve) => setTimeout(resolve, ms));

async function relaxedIdle(page, url, timeoutMs) {
  let inflight = 0;
  const up = () => { inflight += 1; };
  const down = () => { inflight = Math.max(0, inflight - 1); };
  page.on('request', up);
  page.on('requestfinished', down);
  page.on('requestfailed', down);
  const started = Date.now();
  try {
    await page.goto(url, { waitUntil: 'load', timeout: timeoutMs });
    let quietSince = Date.now();
    while (Date.now() - started < timeoutMs) {
      if (inflight > 2) {
        quietSince = Date.now();
      } else if (Date.now() - quietSince >= 500) {
        return;
      }
      await sleep(50);
    }
    throw new Error(`Timeout ${timeoutMs}ms exceeded waiting for relaxed network idle`);
  } finally {
    page.off('request', up);
    page.off('requestfinished', down);
    page.off('requestfailed', down);
  }
}

function walkTree({ maxDepth, markupLimit, htmlLimit }) {
  const SKIP = new Set(['script', 'style', 'meta', 'link', 'title', 'head', 'noscript', 'template']);
  const IMPORTANT = new Set(['body', 'html', 'form', 'table', 'tbody', 'tr']);
  const CONTENT = new Set(['h1', 'h2', 'h3', 'h4', 'h5', 'h6', 'p', 'a', 'button', 'span', 'li',
    'ul', 'ol', 'label', 'blockquote', 'figcaption', 'strong', 'em', 'b', 'i', 'small', 'td', 'th',
    'pre', 'code', 'nav']);
  const OPAQUE = new Set(['form', 'table', 'svg', 'iframe', 'video', 'select', 'textarea', 'input']);
  const LEAF = new Set(['svg', 'iframe', 'video', 'select', 'textarea', 'input']);
  const clip = (value, limit) => (value && value.length > limit ? value.slice(0, limit) : (value || ''));
  const px = (value) => parseFloat(value) || 0;
  const scrollX = window.scrollX;
  const scrollY = window.scrollY;

  function directText(el) {
    let text = '';
    for (const child of el.childNodes) {
      if (child.nodeType === Node.TEXT_NODE) {
        const trimmed = child.textContent.trim();
        if (trimmed) text = text ? `${text} ${trimmed}` : trimmed;
      }
    }
    return text;
  }

  function styleOf(rect, cs) {
    return {
      x: rect.x + scrollX,
      y: rect.y + scrollY,
      width: rect.width,
      height: rect.height,
      display: cs.display,
      position: cs.position,
      float: cs.cssFloat,
      visibility: cs.visibility,
      overflow: cs.overflow,
      opacity: parseFloat(cs.opacity),
      zIndex: cs.zIndex,
      transform: cs.transform,
      flexDirection: cs.flexDirection,
      flexWrap: cs.flexWrap,
      justifyContent: cs.justifyContent,
      alignItems: cs.alignItems,
      gap: cs.gap,
      gridTemplateColumns: cs.gridTemplateColumns,
      margin: { top: px(cs.marginTop), right: px(cs.marginRight), bottom: px(cs.marginBottom), left: px(cs.marginLeft) },
      padding: { top: px(cs.paddingTop), right: px(cs.paddingRight), bottom: px(cs.paddingBottom), left: px(cs.paddingLeft) },
      maxWidth: cs.maxWidth,
      minHeight: cs.minHeight,
      backgroundColor: cs.backgroundColor,
      backgroundImage: cs.backgroundImage,
      backgroundSize: cs.backgroundSize,
      backgroundPosition: cs.backgroundPosition,
      backgroundRepeat: cs.backgroundRepeat,
      color: cs.color,
      fontFamily: cs.fontFamily,
      fontSize: cs.fontSize,
      fontWeight: cs.fontWeight,
      fontStyle: cs.fontStyle,
      lineHeight: cs.lineHeight,
      letterSpacing: cs.letterSpacing,
      textAlign: cs.textAlign,
      textTransform: cs.textTransform,
      textDecoration: cs.textDecorationLine,
      borderWidth: cs.borderTopWidth,
      borderStyle: cs.borderTopStyle,
      borderColor: cs.borderTopColor,
      borderRadius: cs.borderTopLeftRadius,
      boxShadow: cs.boxShadow,
    };
  }

  const nodes = [];
  const warnings = [];
  let truncated = 0;
  const stack = [{ el: document.body, parent: null, depth: 0 }];
  while (stack.length) {
    const { el, parent, depth } = stack.pop();
    const tag = el.tagName.toLowerCase();
    if (SKIP.has(tag)) continue;
    if (depth > maxDepth) {
      truncated += 1;
      continue;
    }
    const rect = el.getBoundingClientRect();
    const cs = window.getComputedStyle(el);
    const text = directText(el);
    const visible = rect.width > 0 && rect.height > 0 && cs.display !== 'none' && cs.visibility !== 'hidden';
    const innerHtml = CONTENT.has(tag) || text ? clip(el.innerHTML, markupLimit) : '';
    const outerHtml = OPAQUE.has(tag) ? clip(el.outerHTML, markupLimit) : '';
    const hasContent = text.length > 0 || innerHtml.trim().length > 0 || outerHtml.length > 0;
    if (!(visible || IMPORTANT.has(tag) || hasContent)) continue;

    const attributes = {};
    for (const attr of el.attributes) {
      if (attr.name !== 'style') attributes[attr.name] = clip(attr.value, 2048);
    }
    const index = nodes.length;
    nodes.push({
      tag,
      id: el.id || '',
      className: typeof el.className === 'string' ? el.className : (el.getAttribute('class') || ''),
      text,
      innerHtml,
      outerHtml,
      style: styleOf(rect, cs),
      attributes,
      parent,
    });
    if (LEAF.has(tag)) continue;
    for (let i = el.children.length - 1; i >= 0; i -= 1) {
      stack.push({ el: el.children[i], parent: index, depth: depth + 1 });
    }
  }

  const cssParts = [];
  for (const sheet of Array.from(document.styleSheets)) {
    try {
      for (const rule of Array.from(sheet.cssRules)) cssParts.push(rule.cssText);
    } catch (err) {
      warnings.push(`stylesheet not readable: ${sheet.href || 'inline'}`);
    }
  }

  return {
    nodes,
    html: clip(document.documentElement.outerHTML, htmlLimit),
    css: clip(cssParts.join('\n'), htmlLimit),
    truncated,
    warnings,
  };
}

function harvest() {
  const warnings = [];
  const attr = (selector, name) => {
    const el = document.querySelector(selector);
    return el ? (el.getAttribute(name) || '') : '';
  };
  const icon = document.querySelector('link[rel~="icon"]');
  const metadata = {
    title: document.title || '',
    description: attr('meta[name="description"]', 'content'),
    favicon: icon ? icon.href : '',
    language: document.documentElement.lang || '',
  };
  const images = Array.from(document.images).map((img) => ({
    src: img.currentSrc || img.src || '',
    alt: img.alt || '',
    width: img.naturalWidth || img.width || 0,
    height: img.naturalHeight || img.height || 0,
    dataSrc: img.getAttribute('data-src') || '',
    dataLazySrc: img.getAttribute('data-lazy-src') || '',
    srcset: img.getAttribute('srcset') || img.getAttribute('data-srcset') || '',
  }));
  const backgroundImages = [];
  const gradients = [];
  const colors = [];
  const fontFamilies = [];
  const all = Array.from(document.querySelectorAll('body, body *')).slice(0, 5000);
  for (const el of all) {
    const cs = window.getComputedStyle(el);
    const bg = cs.backgroundImage;
    if (bg && bg !== 'none') {
      if (bg.includes('gradient(')) gradients.push(bg); else backgroundImages.push(bg);
    }
    colors.push(cs.color, cs.backgroundColor);
    fontFamilies.push(cs.fontFamily);
  }
  const fontFaces = [];
  for (const sheet of Array.from(document.styleSheets)) {
    try {
      for (const rule of Array.from(sheet.cssRules)) {
        if (rule.constructor && rule.constructor.name === 'CSSFontFaceRule') {
          fontFaces.push({ family: rule.style.getPropertyValue('font-family'), src: rule.style.getPropertyValue('src') });
        }
      }
    } catch (err) {
      warnings.push(`stylesheet not readable: ${sheet.href || 'inline'}`);
    }
  }
  const videos = Array.from(document.querySelectorAll('video, iframe, embed')).map((el) => {
    const source = el.querySelector ? el.querySelector('source') : null;
    return { src: el.currentSrc || el.src || (source ? source.src : '') || '', tag: el.tagName.toLowerCase() };
  });
  const forms = Array.from(document.forms).map((form) => ({
    action: form.getAttribute('action') || '',
    method: (form.getAttribute('method') || 'get').toLowerCase(),
    fields: Array.from(form.elements).map((field) => ({
      tag: field.tagName.toLowerCase(),
      type: field.type || '',
      name: field.name || '',
      placeholder: field.placeholder || '',
    })),
  }));
  const label = (el) => ((el.innerText || el.value || '').trim()).slice(0, 200);
  const buttons = Array.from(document.querySelectorAll(
    'button, input[type="submit"], input[type="button"], [role="button"], a[class*="btn"], a[class*="button"]'
  )).map((el) => ({ href: el.href || '', text: label(el) }));
  const links = Array.from(document.querySelectorAll('a[href]')).map((el) => ({ href: el.href, text: label(el) }));
  const stylesheets = Array.from(document.querySelectorAll('link[rel="stylesheet"]')).map((el) => el.href);
  const scripts = Array.from(document.querySelectorAll('script[src]')).map((el) => el.src);
  return {
    metadata, images, backgroundImages, gradients, fontFaces, fontFamilies, colors,
    videos, forms, buttons, links, stylesheets, scripts, warnings,
  };
}

function layout() {
  const LANDMARKS = 'section, header, footer, main, article, nav, aside';
  const elements = [];
  for (const el of Array.from(document.querySelectorAll('body *')).slice(0, 5000)) {
    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) continue;
    const cs = window.getComputedStyle(el);
    elements.push({
      tag: el.tagName.toLowerCase(),
      x: rect.x + window.scrollX,
      y: rect.y + window.scrollY,
      width: rect.width,
      height: rect.height,
      display: cs.display,
      position: cs.position,
      fontSize: cs.fontSize,
      color: cs.color,
      backgroundColor: cs.backgroundColor,
    });
  }
  let textNodes = 0;
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  while (walker.nextNode()) {
    if (walker.currentNode.textContent.trim()) textNodes += 1;
  }
  const count = (selector) => document.querySelectorAll(selector).length;
  return {
    elements,
    counts: {
      totalElements: count('body *'),
      textNodes,
      images: count('img'),
      sections: count(LANDMARKS),
      containers: count('div'),
      headings: count('h1, h2, h3, h4, h5, h6'),
      links: count('a'),
    },
  };
}

const handlers = {
  async openContext(req) {
    const browser = await launch();
    const context = await browser.newContext({ viewport: { width: req.width, height: req.height } });
    const page = await context.newPage();
    nextContextId += 1;
    contexts.set(nextContextId, { context, page });
    return { contextId: nextContextId };
  },
  async closeContext(req) {
    const found = contexts.get(req.contextId);
    if (found) {
      contexts.delete(req.contextId);
      await found.context.close();
    }
    return null;
  },
  async navigate(req) {
    const { page } = entry(req);
    if (req.strategy === 'network-idle-strict') {
      await page.goto(req.url, { waitUntil: 'networkidle', timeout: req.timeoutMs });
    } else if (req.strategy === 'network-idle-relaxed') {
      await relaxedIdle(page, req.url, req.timeoutMs);
    } else {
      await page.goto(req.url, { waitUntil: 'domcontentloaded', timeout: req.timeoutMs });
      await page.waitForTimeout(req.settleMs);
    }
    return { finalUrl: page.url() };
  },
  async setContent(req) {
    const { page } = entry(req);
    await page.setContent(req.html, { waitUntil: 'load', timeout: req.timeoutMs });
    return null;
  },
  async setViewport(req) {
    const { page } = entry(req);
    await page.setViewportSize({ width: req.width, height: req.height });
    return null;
  },
  async scrollLazy(req) {
    const { page } = entry(req);
    await page.evaluate(async ({ stepPx, pauseMs }) => {
      const pause = () => new Promise((resolve) => setTimeout(resolve, pauseMs));
      let y = 0;
      let steps = 0;
      while (y < document.body.scrollHeight && steps < 500) {
        window.scrollTo(0, y);
        y += stepPx;
        steps += 1;
        await pause();
      }
      window.scrollTo(0, document.body.scrollHeight);
      await pause();
      window.scrollTo(0, 0);
    }, { stepPx: req.stepPx, pauseMs: req.pauseMs });
    return null;
  },
  async captureTree(req) {
    const { page } = entry(req);
    return page.evaluate(walkTree, { maxDepth: req.maxDepth, markupLimit: req.markupLimit, htmlLimit: req.htmlLimit });
  },
  async harvestAssets(req) {
    const { page } = entry(req);
    return page.evaluate(harvest);
  },
  async captureLayout(req) {
    const { page } = entry(req);
    if (req.screenshotPath) {
      await page.screenshot({ path: req.screenshotPath, fullPage: true });
    }
    return page.evaluate(layout);
  },
  async shutdown() {
    for (const { context } of contexts.values()) {
      await context.close().catch(() => {});
    }
    contexts.clear();
    if (browserPromise) {
      const browser = await browserPromise.catch(() => null);
      if (browser) await browser.close();
    }
    setImmediate(() => process.exit(0));
    return null;
  },
};

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', (line) => {
  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    process.stderr.write(`ignoring malformed request: ${line.slice(0, 200)}\n`);
    return;
  }
  const handler = handlers[req.op];
  Promise.resolve()
    .then(() => {
      if (!handler) throw new Error(`unknown op ${req.op}`);
      return handler(req);
    })
    .then((result) => send({ id: req.id, status: 'ok', result: result === undefined ? null : result }))
    .catch((err) => send({
      id: req.id,
      status: 'error',
      message: err && err.message ? err.message : String(err),
      kind: errorKind(err),
    }));
});
rl.on('close', () => {
  handlers.shutdown().catch(() => process.exit(0));
});
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Failure reply from the helper.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub(crate) struct ReplyError {
    pub message: Option<String>,
    pub kind: Option<String>,
}

/// Maps a spawn error to an appropriate PclError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> PclError {
    if err.kind() == io::ErrorKind::NotFound {
        PclError::Config(format!(
            "Unable to spawn browser helper; '{}' was not found on PATH",
            command
        ))
    } else {
        PclError::Io(err)
    }
}

fn missing_playwright() -> PclError {
    PclError::Config(
        "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
    )
}

/// Maps a helper error reply for `op` to an appropriate PclError.
pub(crate) fn map_reply_error(op: &str, reply: ReplyError) -> PclError {
    let message = reply
        .message
        .unwrap_or_else(|| "no additional details".to_string());
    match reply.kind.as_deref() {
        Some("missing-playwright") => missing_playwright(),
        Some("missing-browser") => PclError::Config(format!(
            "Chromium executable for Playwright is missing: {message}"
        )),
        Some("timeout") => PclError::Browser(format!(
            "{op} timed out: {message}. Hint: increase --nav-timeout or --process-timeout."
        )),
        _ if message
            .to_ascii_lowercase()
            .contains("cannot find module 'playwright'") =>
        {
            missing_playwright()
        }
        _ => PclError::Browser(format!("{op} failed: {message}")),
    }
}

/// Maps stderr of a failed availability probe to an appropriate PclError.
pub(crate) fn map_probe_error(status_text: impl Into<String>, stderr: &str) -> PclError {
    if stderr
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        return missing_playwright();
    }

    PclError::Config(format!(
        "Playwright probe exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            PclError::Config(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(PclError::Config(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            PclError::Config(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_probe_error(format!("{:?}", output.status), &stderr));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_error_detects_missing_module() {
        let err = map_reply_error(
            "openContext",
            ReplyError {
                message: Some("Cannot find module 'playwright'".to_string()),
                kind: Some("missing-playwright".to_string()),
            },
        );
        match err {
            PclError::Config(msg) => assert!(
                msg.contains("Playwright npm package is missing"),
                "expected missing playwright hint, got: {msg}"
            ),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn reply_error_detects_missing_module_without_kind() {
        let err = map_reply_error(
            "openContext",
            ReplyError {
                message: Some("Error: Cannot find module 'playwright'".to_string()),
                kind: None,
            },
        );
        assert!(format!("{err}").contains("npm install playwright"));
    }

    #[test]
    fn reply_error_includes_timeout_hint() {
        let err = map_reply_error(
            "navigate",
            ReplyError {
                message: Some("Timeout 30000ms exceeded".to_string()),
                kind: Some("timeout".to_string()),
            },
        );
        let msg = format!("{err}");
        assert!(msg.contains("timed out"), "expected timeout mention, got: {msg}");
        assert!(msg.contains("--nav-timeout"), "expected CLI hint, got: {msg}");
    }

    #[test]
    fn reply_error_reports_missing_browser_as_config() {
        let err = map_reply_error(
            "openContext",
            ReplyError {
                message: Some("Executable doesn't exist at /ms-playwright/chromium".to_string()),
                kind: Some("missing-browser".to_string()),
            },
        );
        assert!(matches!(err, PclError::Config(_)));
        assert!(err.to_payload().remediation.unwrap_or_default().contains("playwright install"));
    }

    #[test]
    fn reply_error_preserves_other_messages() {
        let err = map_reply_error(
            "captureTree",
            ReplyError {
                message: Some("Execution context was destroyed".to_string()),
                kind: Some("error".to_string()),
            },
        );
        let msg = format!("{err}");
        assert!(msg.contains("captureTree failed"));
        assert!(msg.contains("Execution context was destroyed"));
    }

    #[test]
    fn probe_error_handles_plain_stderr_missing_module() {
        let err = map_probe_error(
            "exit status: 1",
            "Error: Cannot find module 'playwright'\n    at Module._resolveFilename",
        );
        assert!(format!("{err}").contains("Playwright npm package is missing"));
    }

    #[test]
    fn driver_script_handles_every_operation() {
        for op in [
            "openContext",
            "closeContext",
            "navigate",
            "setContent",
            "setViewport",
            "scrollLazy",
            "captureTree",
            "harvestAssets",
            "captureLayout",
            "shutdown",
        ] {
            assert!(
                DRIVER_SCRIPT.contains(&format!("async {op}(")),
                "helper script is missing handler for {op}"
            );
        }
    }

    #[tokio::test]
    async fn ensure_node_available_fails_for_missing_binary() {
        let result = ensure_node_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ensure_playwright_available_fails_for_missing_binary() {
        let result = ensure_playwright_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }
}
