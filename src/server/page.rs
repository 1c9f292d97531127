use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::core::config::CompanyConfig;
use crate::state::AppState;

pub const PAGE_TITLE: &str = "Customer Support Chat";
pub const INPUT_PLACEHOLDER: &str = "Ask a question (or say: create a ticket...)";

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render(&state.config.company))
}

pub fn caption(company: &CompanyConfig) -> String {
    format!("{} • {} • {}", company.name, company.email, company.phone)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render(company: &CompanyConfig) -> String {
    PAGE_TEMPLATE
        .replace("{{title}}", PAGE_TITLE)
        .replace("{{caption}}", &escape_html(&caption(company)))
        .replace("{{placeholder}}", &escape_html(INPUT_PLACEHOLDER))
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}}</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 760px; margin: 0 auto; padding: 1.5rem; }
  h1 { margin-bottom: 0.2rem; }
  .caption { color: #666; margin-bottom: 1.5rem; }
  #log { display: flex; flex-direction: column; gap: 0.75rem; margin-bottom: 5rem; }
  .msg { padding: 0.6rem 0.9rem; border-radius: 0.5rem; white-space: pre-wrap; }
  .user { background: #eef3ff; align-self: flex-end; }
  .assistant { background: #f4f4f4; align-self: flex-start; }
  .sources { color: #555; font-size: 0.85rem; margin-top: 0.4rem; }
  .error { background: #fdecea; }
  form { position: fixed; bottom: 0; left: 0; right: 0; padding: 1rem; background: #fff;
         display: flex; justify-content: center; border-top: 1px solid #ddd; }
  input { width: min(700px, 80vw); padding: 0.6rem; font-size: 1rem; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<div class="caption">{{caption}}</div>
<div id="log"></div>
<form id="chat">
  <input id="message" autocomplete="off" placeholder="{{placeholder}}">
</form>
<script>
let sessionId = null;
const log = document.getElementById("log");
const input = document.getElementById("message");

function append(role, text, sources) {
  const div = document.createElement("div");
  div.className = "msg " + role;
  div.textContent = text;
  if (sources) {
    const s = document.createElement("div");
    s.className = "sources";
    s.textContent = sources;
    div.appendChild(s);
  }
  log.appendChild(div);
  window.scrollTo(0, document.body.scrollHeight);
  return div;
}

document.getElementById("chat").addEventListener("submit", async (event) => {
  event.preventDefault();
  const text = input.value.trim();
  if (!text) return;
  input.value = "";
  append("user", text);
  const pending = append("assistant", "Thinking...");
  try {
    const res = await fetch("/api/chat", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ session_id: sessionId, message: text }),
    });
    const body = await res.json();
    pending.remove();
    if (!res.ok) {
      append("assistant error", body.error || ("Request failed: " + res.status));
      return;
    }
    sessionId = body.session_id;
    append("assistant", body.answer, body.sources);
  } catch (err) {
    pending.remove();
    append("assistant error", String(err));
  }
});
</script>
</body>
</html>
"#;
