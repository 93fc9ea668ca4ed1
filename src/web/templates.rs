//! Page templates
//!
//! Templates are compiled into the binary and registered once at startup.
//! Names end in `.html`, which turns on minijinja's HTML auto-escaping for
//! every interpolated value.

use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;

const BASE: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{% block title %}Lesson Forge{% endblock %}</title>
{% block head %}{% endblock %}
<style>
:root { --primary: #016B61; --secondary: #70B2B2; --accent: #9ECFD4; --surface: #E5E9C5; }
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; background: var(--surface); color: #1e293b; }
a { color: var(--primary); }
header.bar { display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; background: #fff; border-bottom: 1px solid var(--accent); }
header.bar .brand { display: flex; gap: .5rem; align-items: center; text-decoration: none; }
header.bar h1 { margin: 0; font-size: 1.25rem; color: var(--primary); }
.account { display: flex; gap: 1rem; align-items: center; }
.badge { background: var(--accent); color: var(--primary); border-radius: 999px; padding: .25rem .75rem; font-weight: 600; }
main { max-width: 72rem; margin: 2rem auto; padding: 0 1rem; display: grid; gap: 1.5rem; grid-template-columns: 2fr 1fr; }
.card { background: #fff; border-radius: 1.5rem; padding: 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.wide { grid-column: 1 / 2; }
textarea, input[type=email], input[type=password] { width: 100%; padding: .75rem; border: 1px solid var(--accent); border-radius: .75rem; font: inherit; }
button, .button { background: var(--primary); color: #fff; border: 0; border-radius: .75rem; padding: .6rem 1.2rem; font: inherit; cursor: pointer; text-decoration: none; }
button:disabled { opacity: .5; cursor: not-allowed; }
button.secondary { background: #fff; color: var(--primary); border: 1px solid var(--secondary); }
button.link { background: none; color: var(--primary); padding: 0; }
.tabs { display: flex; gap: .5rem; margin-bottom: 1rem; }
.tab { padding: .4rem 1rem; border-radius: .75rem; background: var(--surface); cursor: pointer; }
.tab.active { background: #fff; color: var(--primary); box-shadow: 0 1px 2px rgba(0,0,0,.1); }
.row { display: flex; justify-content: space-between; align-items: center; margin-top: 1rem; }
.message { padding: .75rem 1rem; border-radius: .75rem; margin-bottom: 1rem; }
.message.error { background: #fee2e2; color: #b91c1c; }
.message.success { background: #dcfce7; color: #15803d; }
.muted { color: #64748b; font-size: .875rem; margin: 0; }
.history { list-style: none; padding: 0; margin: 0; }
.history li { display: flex; justify-content: space-between; align-items: center; padding: .75rem 0; border-bottom: 1px solid var(--surface); }
.empty { text-align: center; padding: 2rem 0; }
.tag { background: var(--accent); color: var(--primary); border-radius: 999px; padding: 0 .5rem; font-size: .75rem; }
.bundle { display: block; width: 100%; margin-top: .75rem; }
.auth { max-width: 28rem; margin: 4rem auto; }
.auth label { display: block; margin: 1rem 0 .25rem; font-weight: 600; }
.divider { text-align: center; color: #64748b; margin: 1.5rem 0 1rem; }
.center { text-align: center; }
</style>
</head>
<body>
{% block body %}{% endblock %}
</body>
</html>
"##;

const HOME: &str = r##"{% extends "base.html" %}
{% block body %}
<header class="bar">
  <a href="/" class="brand"><span aria-hidden="true">&#9889;</span><h1>Lesson Forge</h1></a>
  <div class="account">
    {% if user_email %}<span class="muted">{{ user_email }}</span>{% endif %}
    <span class="badge">{{ credit.credits }} Credits</span>
    {% if credit.authenticated %}
    <form method="post" action="/logout"><button type="submit" class="link">Sign Out</button></form>
    {% else %}
    <a href="/login" class="button">Sign In</a>
    {% endif %}
  </div>
</header>
<main>
  <section class="card wide">
    <h2>Lesson Forge</h2>
    {% if error %}<div class="message error">{{ error }}</div>{% endif %}
    {% if file_url %}<div class="message success">Your content is ready. <a href="{{ file_url }}" target="_blank">Download</a></div>{% endif %}
    <form id="forge" method="post" action="/generate"
          data-lesson="{{ pricing.lesson_cost }}" data-presentation="{{ pricing.presentation_cost }}"
          data-images="{{ pricing.image_surcharge }}" data-balance="{{ credit.credits }}"
          data-authenticated="{{ credit.authenticated }}" data-loading="{{ form.is_loading }}">
      <div class="tabs">
        {% for option in content_types %}
        <label class="tab{% if option.value == form.content_type %} active{% endif %}">
          <input type="radio" name="content_type" value="{{ option.value }}"{% if option.value == form.content_type %} checked{% endif %}> {{ option.label }}
        </label>
        {% endfor %}
      </div>
      <textarea name="prompt" rows="6" placeholder="{{ placeholder }}">{{ form.prompt }}</textarea>
      <label><input type="checkbox" name="include_images" value="true"{% if form.include_images %} checked{% endif %}> Include image suggestions</label>
      <div class="row">
        <div>
          <p id="cost">Cost: {{ cost }} Credits</p>
          <p class="muted">Current Balance: {{ credit.credits }}</p>
        </div>
        <button type="submit" id="forge-button"{% if disabled_reason %} disabled{% endif %}>Forge Content</button>
      </div>
      <p id="hint" class="muted">{% if disabled_message %}{{ disabled_message }}{% endif %}</p>
    </form>
  </section>
  <aside class="card">
    <h3>{{ panel.title }}</h3>
    {% for bundle in panel.bundles %}
    <button type="button" class="bundle{% if not bundle.best_value %} secondary{% endif %}">
      {% if bundle.best_value %}<span class="tag">Best Value</span> {% endif %}{{ bundle.label }}
    </button>
    {% endfor %}
  </aside>
  <section class="card wide">
    <h3>Your Forge History</h3>
    {% if history.kind == "populated" %}
    <ul class="history">
      {% for row in history.rows %}
      <li>
        <div><p>{{ row.prompt }}</p><p class="muted">{{ row.label }} &middot; {{ row.date }}</p></div>
        <a href="{{ row.download_url }}" target="_blank" aria-label="Download generated file">Download</a>
      </li>
      {% endfor %}
    </ul>
    {% elif history.kind == "loading" %}
    <p class="muted" id="history-loading">Forging in progress. Refresh to see your new file.</p>
    {% else %}
    <div class="empty">
      <h3>{{ empty_title }}</h3>
      <p class="muted">{{ empty_message }}</p>
    </div>
    {% endif %}
  </section>
</main>
<script>
(function () {
  var form = document.getElementById("forge");
  var button = document.getElementById("forge-button");
  var hint = document.getElementById("hint");
  var cost = document.getElementById("cost");
  function price() {
    var kind = form.querySelector("input[name=content_type]:checked").value;
    var images = form.querySelector("input[name=include_images]").checked;
    return Number(form.dataset[kind]) + (images ? Number(form.dataset.images) : 0);
  }
  function refresh() {
    var n = price();
    cost.textContent = "Cost: " + n + " Credits";
    var reason = "";
    if (!form.prompt.value.trim()) reason = "Describe the lesson you want to forge";
    else if (form.dataset.loading === "true") reason = "Forging your content...";
    else if (form.dataset.authenticated !== "true") reason = "Sign in to forge content";
    else if (n > Number(form.dataset.balance)) reason = "Not enough credits for this request";
    button.disabled = reason !== "";
    hint.textContent = reason;
  }
  form.addEventListener("input", refresh);
  form.addEventListener("change", refresh);
  form.addEventListener("submit", function () {
    button.disabled = true;
    button.textContent = "Forging...";
  });
})();
</script>
{% endblock %}
"##;

const LOGIN: &str = r##"{% extends "base.html" %}
{% block title %}Sign In - Lesson Forge{% endblock %}
{% block body %}
<div class="auth">
  <div class="center">
    <h1>Lesson Forge</h1>
    <p class="muted">Helping Forge Future Minds</p>
  </div>
  <div class="card">
    <h2>{{ title }}</h2>
    {% if form.message %}<div class="message {{ form.message.kind }}">{{ form.message.text }}</div>{% endif %}
    <form method="post" action="/login">
      <input type="hidden" name="mode" value="{{ mode }}">
      <label for="email">Email Address</label>
      <input id="email" type="email" name="email" value="{{ form.email }}" placeholder="teacher@example.com" required>
      <label for="password">Password</label>
      <input id="password" type="password" name="password" placeholder="&bull;&bull;&bull;&bull;&bull;&bull;&bull;&bull;" required>
      <div class="row"><button type="submit"{% if form.is_loading %} disabled{% endif %}>{% if form.is_loading %}Please wait...{% else %}{{ submit_label }}{% endif %}</button></div>
    </form>
    {% if form.google_enabled %}
    <p class="divider">Or continue with</p>
    <a href="/auth/google" class="button secondary bundle center">Google</a>
    {% endif %}
    <p class="center">{{ toggle_prompt }} <a href="/login?mode={{ toggle_mode }}">{{ toggle_label }}</a></p>
  </div>
  <p class="center"><a href="/">Back to Home</a></p>
</div>
{% endblock %}
"##;

const CALLBACK: &str = r##"{% extends "base.html" %}
{% block head %}<meta http-equiv="refresh" content="1; url=/">{% endblock %}
{% block body %}
<div class="auth center">
  <div class="card">
    <h2>Completing Sign In...</h2>
    <p class="muted">Forging your session, please wait.</p>
    <p><a href="/">Continue</a></p>
  </div>
</div>
{% endblock %}
"##;

/// Registered page templates
pub struct Templates {
    env: Environment<'static>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").finish_non_exhaustive()
    }
}

impl Templates {
    /// Compile all page templates
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Template` if a template fails to parse
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("base.html", BASE)?;
        env.add_template("home.html", HOME)?;
        env.add_template("login.html", LOGIN)?;
        env.add_template("callback.html", CALLBACK)?;
        Ok(Self { env })
    }

    /// Render a template with `context`
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}
