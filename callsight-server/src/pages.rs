//! Dashboard pages.
//!
//! Five pages, one per route. The current page is whatever path was
//! requested; there is no navigation history. Every page shares the same
//! sidebar listing all five.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Form, Router};
use callsight_core::stats::SatisfactionSummary;
use callsight_core::{CallsightConfig, Dataset, NewSession, ReportEmbed};
use serde::Deserialize;

use crate::http::{self, HttpState, PredictRequest};

const INTRODUCTION: &str = "This BI project analyzes a cable company's call center operations, \
identifying the factors that influence customer satisfaction: agent performance, call topics, \
speed of answer and average talk duration. The goal is to improve customer service and \
operational efficiency, reduce churn and strengthen brand loyalty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    PredictiveAnalysis,
    AddSession,
    Report1,
    Report2,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Home,
        Page::PredictiveAnalysis,
        Page::AddSession,
        Page::Report1,
        Page::Report2,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::PredictiveAnalysis => "/predict",
            Page::AddSession => "/sessions/new",
            Page::Report1 => "/reports/1",
            Page::Report2 => "/reports/2",
        }
    }

    pub fn title<'a>(&self, config: &'a CallsightConfig) -> &'a str {
        match self {
            Page::Home => "Home",
            Page::PredictiveAnalysis => "Predictive Analysis",
            Page::AddSession => "Add New Session",
            Page::Report1 => &config.reports.page_1.title,
            Page::Report2 => &config.reports.page_2.title,
        }
    }
}

pub fn page_routes() -> Router<Arc<HttpState>> {
    Router::new()
        .route(Page::Home.path(), get(home_page))
        .route(
            Page::PredictiveAnalysis.path(),
            get(predict_page).post(predict_submit),
        )
        .route(
            Page::AddSession.path(),
            get(add_session_page).post(add_session_submit),
        )
        .route(Page::Report1.path(), get(report_page_1))
        .route(Page::Report2.path(), get(report_page_2))
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
}

#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub agent: String,
    pub topic: String,
    pub speed_of_answer: u32,
    pub avg_talk_duration: f64,
    pub satisfaction_rating: u8,
}

/// Ratings entered from the dashboard must be 1–5; 0 is reserved for unrated.
pub fn validate_rating(rating: u8) -> Result<(), String> {
    if (1..=callsight_core::dataset::MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(format!("Satisfaction rating must be between 1 and 5, got {rating}"))
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn home_page(State(state): State<Arc<HttpState>>) -> Html<String> {
    let body = format!(
        "<h1>Call Center Operations Analysis</h1>\n<h2>Project Introduction</h2>\n<p>{}</p>",
        INTRODUCTION
    );
    layout(&state.config, Page::Home, &body)
}

pub async fn predict_page(State(state): State<Arc<HttpState>>) -> (StatusCode, Html<String>) {
    render_with_dataset(&state, Page::PredictiveAnalysis, |dataset| {
        predict_body(dataset, None)
    })
    .await
}

pub async fn predict_submit(
    State(state): State<Arc<HttpState>>,
    form: Result<Form<PredictForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let dataset = match http::load_context(&state).await {
        Ok(d) => d,
        Err(e) => return error_page(&state.config, Page::PredictiveAnalysis, &e.to_string()),
    };

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            let result = rejection_html(&rejection);
            let body = predict_body(&dataset, Some(&result));
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                layout(&state.config, Page::PredictiveAnalysis, &body),
            );
        }
    };

    let req = PredictRequest {
        agent: form.agent,
        topic: form.topic,
        speed_of_answer: form.speed_of_answer,
        avg_talk_duration: form.avg_talk_duration,
    };

    let (status, result) = match http::predict_with(&state, &dataset, &req).await {
        Ok(outcome) => {
            let mut html = format!(
                "<p class=\"result\">Predicted Satisfaction Rating: <strong>{}</strong></p>\n",
                outcome.prediction
            );
            html.push_str(&summary_html(&outcome.summary));
            (StatusCode::OK, html)
        }
        Err(e) => {
            tracing::warn!("Prediction failed: {}", e);
            let prefix = if e.is_user_error() {
                "Encoding error"
            } else {
                "Error in prediction"
            };
            (
                http::error_status(&e),
                message_html("error", &format!("{prefix}: {e}")),
            )
        }
    };

    let body = predict_body(&dataset, Some(&result));
    (status, layout(&state.config, Page::PredictiveAnalysis, &body))
}

pub async fn add_session_page(State(state): State<Arc<HttpState>>) -> (StatusCode, Html<String>) {
    render_with_dataset(&state, Page::AddSession, |dataset| {
        add_session_body(dataset, None)
    })
    .await
}

pub async fn add_session_submit(
    State(state): State<Arc<HttpState>>,
    form: Result<Form<SessionForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let (status, result) = match form {
        Err(rejection) => (StatusCode::UNPROCESSABLE_ENTITY, rejection_html(&rejection)),
        Ok(Form(form)) => add_session_result(&state, form).await,
    };

    let dataset = match http::load_context(&state).await {
        Ok(d) => d,
        Err(e) => return error_page(&state.config, Page::AddSession, &e.to_string()),
    };
    let body = add_session_body(&dataset, Some(&result));
    (status, layout(&state.config, Page::AddSession, &body))
}

async fn add_session_result(state: &HttpState, form: SessionForm) -> (StatusCode, String) {
    match validate_rating(form.satisfaction_rating) {
        Err(msg) => (StatusCode::UNPROCESSABLE_ENTITY, message_html("error", &msg)),
        Ok(()) => {
            let session = NewSession {
                agent: form.agent,
                topic: form.topic,
                speed_of_answer: form.speed_of_answer,
                avg_talk_duration: form.avg_talk_duration,
                satisfaction_rating: form.satisfaction_rating,
            };
            match http::run_add_session(state, session).await {
                Ok(_) => (
                    StatusCode::OK,
                    message_html("success", "Session added successfully!"),
                ),
                Err(e) => {
                    tracing::warn!("Add session failed: {}", e);
                    (http::error_status(&e), message_html("error", &e.to_string()))
                }
            }
        }
    }
}

pub async fn report_page_1(State(state): State<Arc<HttpState>>) -> Html<String> {
    let body = report_body(1, &state.config.reports.page_1);
    layout(&state.config, Page::Report1, &body)
}

pub async fn report_page_2(State(state): State<Arc<HttpState>>) -> Html<String> {
    let body = report_body(2, &state.config.reports.page_2);
    layout(&state.config, Page::Report2, &body)
}

pub async fn not_found(State(state): State<Arc<HttpState>>) -> (StatusCode, Html<String>) {
    let body = message_html("error", "Page not found.");
    (StatusCode::NOT_FOUND, layout(&state.config, Page::Home, &body))
}

async fn render_with_dataset<F>(state: &HttpState, page: Page, render: F) -> (StatusCode, Html<String>)
where
    F: FnOnce(&Dataset) -> String,
{
    match http::load_context(state).await {
        Ok(dataset) => (StatusCode::OK, layout(&state.config, page, &render(&dataset))),
        Err(e) => error_page(&state.config, page, &e.to_string()),
    }
}

fn error_page(config: &CallsightConfig, page: Page, msg: &str) -> (StatusCode, Html<String>) {
    tracing::error!("Failed to load dataset: {}", msg);
    let body = message_html("error", &format!("Failed to load dataset: {msg}"));
    (StatusCode::INTERNAL_SERVER_ERROR, layout(config, page, &body))
}

// ============================================================================
// Rendering
// ============================================================================

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(config: &CallsightConfig, current: Page, body: &str) -> Html<String> {
    let mut nav = String::new();
    for page in Page::ALL {
        let class = if page == current { " class=\"active\"" } else { "" };
        let _ = writeln!(
            nav,
            "<li><a href=\"{}\"{}>{}</a></li>",
            page.path(),
            class,
            escape_html(page.title(config))
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} · Callsight</title>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; }}
nav {{ width: 14rem; min-height: 100vh; background: #f0f2f6; padding: 1rem; }}
nav ul {{ list-style: none; padding: 0; }}
nav a.active {{ font-weight: bold; }}
main {{ padding: 1rem 2rem; flex: 1; }}
.error {{ color: #b00020; }}
.success {{ color: #1b5e20; }}
table {{ border-collapse: collapse; margin-bottom: 1.5rem; }}
td, th {{ border: 1px solid #ccc; padding: 0.2rem 0.6rem; text-align: left; }}
.bar {{ background: #4e79a7; height: 0.8rem; }}
</style>
</head>
<body>
<nav>
<h2>Navigation</h2>
<ul>
{nav}</ul>
</nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(current.title(config)),
        nav = nav,
        body = body,
    ))
}

fn message_html(class: &str, msg: &str) -> String {
    format!("<p class=\"{}\">{}</p>\n", class, escape_html(msg))
}

fn rejection_html(rejection: &FormRejection) -> String {
    tracing::warn!("Rejected form submission: {}", rejection.body_text());
    message_html("error", &format!("Invalid input: {}", rejection.body_text()))
}

fn options_html(classes: &[String]) -> String {
    classes
        .iter()
        .map(|c| {
            let c = escape_html(c);
            format!("<option value=\"{c}\">{c}</option>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn session_inputs_html(dataset: &Dataset) -> String {
    format!(
        r#"<label>Select Agent <select name="agent">{agents}</select></label><br>
<label>Select Topic <select name="topic">{topics}</select></label><br>
<label>Speed of Answer (in seconds) <input type="number" name="speed_of_answer" min="0" step="1" value="0" required></label><br>
<label>Average Talk Duration (in seconds) <input type="number" name="avg_talk_duration" min="0" step="any" value="0" required></label><br>
"#,
        agents = options_html(dataset.agents.classes()),
        topics = options_html(dataset.topics.classes()),
    )
}

fn predict_body(dataset: &Dataset, result: Option<&str>) -> String {
    format!(
        r#"<h1>Predictive Analysis</h1>
<h2>Predict customer satisfaction based on call center session details.</h2>
<form method="post" action="{action}">
{inputs}<button type="submit">Predict</button>
</form>
{result}"#,
        action = Page::PredictiveAnalysis.path(),
        inputs = session_inputs_html(dataset),
        result = result.unwrap_or(""),
    )
}

fn add_session_body(dataset: &Dataset, result: Option<&str>) -> String {
    format!(
        r#"<h1>Add New Session</h1>
<h2>Add new session data for further analysis and model training.</h2>
<form method="post" action="{action}">
{inputs}<label>Satisfaction Rating <input type="range" name="satisfaction_rating" min="1" max="5" step="1" value="1"></label><br>
<button type="submit">Add Session</button>
</form>
{result}"#,
        action = Page::AddSession.path(),
        inputs = session_inputs_html(dataset),
        result = result.unwrap_or(""),
    )
}

fn report_body(n: u8, embed: &ReportEmbed) -> String {
    format!(
        "<h1>{title}</h1>\n<p>Power BI Visualization {n}:</p>\n\
         <iframe src=\"{url}\" width=\"{width}\" height=\"{height}\" frameborder=\"0\" allowfullscreen></iframe>\n",
        title = escape_html(&embed.title),
        n = n,
        url = escape_html(&embed.url),
        width = embed.width,
        height = embed.height,
    )
}

fn bar(value: f64, max: f64) -> String {
    let pct = if max > 0.0 { value / max * 100.0 } else { 0.0 };
    format!("<div class=\"bar\" style=\"width: {pct:.1}%\"></div>")
}

fn summary_html(summary: &SatisfactionSummary) -> String {
    let mut html = String::from("<h2>Historical Satisfaction Ratings</h2>\n");

    html.push_str("<h3>Satisfaction Ratings by Agent and Topic</h3>\n<table>\n");
    html.push_str("<tr><th>Agent</th><th>Topic</th><th>Min</th><th>Q1</th><th>Median</th><th>Q3</th><th>Max</th><th>Sessions</th></tr>\n");
    for s in &summary.spread {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&s.agent),
            escape_html(&s.topic),
            s.min,
            s.q1,
            s.median,
            s.q3,
            s.max,
            s.sessions
        );
    }
    html.push_str("</table>\n");

    let max_count = summary.rating_counts.iter().map(|c| c.count).max().unwrap_or(0) as f64;
    html.push_str("<h3>Count of Satisfaction Ratings</h3>\n<table>\n<tr><th>Satisfaction Rating</th><th>Count</th><th></th></tr>\n");
    for c in &summary.rating_counts {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td style=\"width: 12rem\">{}</td></tr>",
            c.rating,
            c.count,
            bar(c.count as f64, max_count)
        );
    }
    html.push_str("</table>\n");

    for (heading, label, groups) in [
        ("Average Satisfaction Rating by Agent", "Agent", &summary.by_agent),
        ("Average Satisfaction Rating by Topic", "Topic", &summary.by_topic),
    ] {
        let _ = writeln!(
            html,
            "<h3>{heading}</h3>\n<table>\n<tr><th>{label}</th><th>Average Satisfaction</th><th></th></tr>"
        );
        for g in groups.iter() {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{:.2}</td><td style=\"width: 12rem\">{}</td></tr>",
                escape_html(&g.name),
                g.mean_rating,
                bar(g.mean_rating, callsight_core::dataset::MAX_RATING as f64)
            );
        }
        html.push_str("</table>\n");
    }

    let max_bin = summary.speed_histogram.iter().map(|b| b.count).max().unwrap_or(0) as f64;
    html.push_str("<h3>Distribution of Speed of Answer</h3>\n<table>\n<tr><th>Speed of Answer (seconds)</th><th>Count</th><th></th></tr>\n");
    for b in &summary.speed_histogram {
        let _ = writeln!(
            html,
            "<tr><td>{:.1} – {:.1}</td><td>{}</td><td style=\"width: 12rem\">{}</td></tr>",
            b.lower,
            b.upper,
            b.count,
            bar(b.count as f64, max_bin)
        );
    }
    html.push_str("</table>\n");

    html
}
